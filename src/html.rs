// === Module Header (agents-tooling) START ===
// header: Parsed by scripts/check_module_headers.sh for purpose/role presence; keep keys on single-line entries.
// purpose: Lenient HTML tree for issue detail pages with the handful of selectors the exporter needs
// role: parsing/html
// inputs: Raw page HTML and the URL it was fetched from
// outputs: Element tree; class/tag/direct-child lookups; leading text, full text, and content node runs
// invariants:
// - Parsing never fails; malformed markup degrades to text or implicit closes
// - Entities are decoded in text and attribute values
// - Element::leading_text mirrors lxml `.text` (text before the first child element)
// errors: None surfaced; absolutize skips values the url crate cannot join
// tie_breakers: contracts > orchestration > correctness > performance > minimal_diffs
// === Module Header END ===

use once_cell::sync::Lazy;
use regex::Regex;
use url::Url;

static ATTR_RE: Lazy<Regex> = Lazy::new(|| {
  Regex::new(r#"([^\s=/>"']+)(?:\s*=\s*(?:"([^"]*)"|'([^']*)'|([^\s"'>]+)))?"#).unwrap()
});

const VOID_TAGS: &[&str] = &[
  "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param", "source", "track", "wbr",
];
const RAW_TEXT_TAGS: &[&str] = &["script", "style"];

#[derive(Clone, Debug, PartialEq)]
pub enum Node {
  Text(String),
  Element(Element),
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Element {
  pub name: String,
  pub attrs: Vec<(String, String)>,
  pub children: Vec<Node>,
}

/// One entry of an element's direct content, as seen by the paragraph segmenter.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ContentNode {
  Text(String),
  Element { tag: String, text: String },
}

impl Element {
  fn new(name: &str, attrs: Vec<(String, String)>) -> Self {
    Self { name: name.to_string(), attrs, children: Vec::new() }
  }

  pub fn attr(&self, name: &str) -> Option<&str> {
    self.attrs.iter().find(|(k, _)| k == name).map(|(_, v)| v.as_str())
  }

  pub fn has_class(&self, class: &str) -> bool {
    self.attr("class").map(|c| c.split_whitespace().any(|x| x == class)).unwrap_or(false)
  }

  pub fn child_elements(&self) -> impl Iterator<Item = &Element> {
    self.children.iter().filter_map(|n| match n {
      Node::Element(e) => Some(e),
      Node::Text(_) => None,
    })
  }

  /// All descendant elements in document order (excluding self).
  pub fn descendants(&self) -> Vec<&Element> {
    let mut out = Vec::new();
    fn walk<'a>(e: &'a Element, out: &mut Vec<&'a Element>) {
      for c in e.child_elements() {
        out.push(c);
        walk(c, out);
      }
    }
    walk(self, &mut out);
    out
  }

  pub fn find_all(&self, pred: impl Fn(&Element) -> bool) -> Vec<&Element> {
    self.descendants().into_iter().filter(|e| pred(e)).collect()
  }

  pub fn find_first(&self, pred: impl Fn(&Element) -> bool) -> Option<&Element> {
    self.descendants().into_iter().find(|e| pred(e))
  }

  pub fn by_class(&self, class: &str) -> Vec<&Element> {
    self.find_all(|e| e.has_class(class))
  }

  pub fn by_tag(&self, tag: &str) -> Vec<&Element> {
    self.find_all(|e| e.name == tag)
  }

  /// `.<parent_class> .<class>`: descendants with `class` that sit below an element with `parent_class`.
  pub fn nested_class(&self, parent_class: &str, class: &str) -> Vec<&Element> {
    let mut out: Vec<&Element> = Vec::new();
    for parent in self.by_class(parent_class) {
      for e in parent.by_class(class) {
        if !out.iter().any(|seen| std::ptr::eq(*seen, e)) {
          out.push(e);
        }
      }
    }
    out
  }

  /// `.<parent_class> > <tag>`
  pub fn direct_children_of_class(&self, parent_class: &str, tag: &str) -> Vec<&Element> {
    self
      .by_class(parent_class)
      .into_iter()
      .flat_map(|p| p.child_elements().filter(|c| c.name == tag))
      .collect()
  }

  /// Text before the first child element.
  pub fn leading_text(&self) -> String {
    let mut out = String::new();
    for c in &self.children {
      match c {
        Node::Text(t) => out.push_str(t),
        Node::Element(_) => break,
      }
    }
    out
  }

  /// Full descendant text with whitespace runs collapsed.
  pub fn text(&self) -> String {
    let mut raw = String::new();
    fn walk(e: &Element, out: &mut String) {
      for c in &e.children {
        match c {
          Node::Text(t) => out.push_str(t),
          Node::Element(el) => {
            if el.name == "br" {
              out.push(' ');
            }
            walk(el, out);
          }
        }
      }
    }
    walk(self, &mut raw);
    raw.split_whitespace().collect::<Vec<_>>().join(" ")
  }

  pub fn content_nodes(&self) -> Vec<ContentNode> {
    self
      .children
      .iter()
      .map(|c| match c {
        Node::Text(t) => ContentNode::Text(t.clone()),
        Node::Element(e) => ContentNode::Element { tag: e.name.clone(), text: e.leading_text() },
      })
      .collect()
  }

  fn push_text(&mut self, text: &str) {
    if text.is_empty() {
      return;
    }
    if let Some(Node::Text(last)) = self.children.last_mut() {
      last.push_str(text);
    } else {
      self.children.push(Node::Text(text.to_string()));
    }
  }

  /// Rewrite relative `href`/`src` attributes against `base`.
  pub fn absolutize_links(&mut self, base: &Url) {
    for (k, v) in self.attrs.iter_mut() {
      if k == "href" || k == "src" {
        if let Ok(joined) = base.join(v) {
          *v = joined.to_string();
        }
      }
    }
    for c in self.children.iter_mut() {
      if let Node::Element(e) = c {
        e.absolutize_links(base);
      }
    }
  }
}

/// Parse a document into a synthetic `#document` root element.
pub fn parse(html: &str) -> Element {
  let mut stack: Vec<Element> = vec![Element::new("#document", Vec::new())];
  let bytes = html.as_bytes();
  let mut pos = 0;
  let mut text_start = 0;

  macro_rules! flush_text {
    ($end:expr) => {
      if $end > text_start {
        let decoded = decode_entities(&html[text_start..$end]);
        if let Some(top) = stack.last_mut() {
          top.push_text(&decoded);
        }
      }
    };
  }

  while pos < bytes.len() {
    if bytes[pos] != b'<' {
      pos += 1;
      continue;
    }

    let rest = &html[pos..];
    if rest.starts_with("<!--") {
      flush_text!(pos);
      pos = rest.find("-->").map(|i| pos + i + 3).unwrap_or(bytes.len());
      text_start = pos;
      continue;
    }
    if rest.starts_with("<!") || rest.starts_with("<?") {
      flush_text!(pos);
      pos = rest.find('>').map(|i| pos + i + 1).unwrap_or(bytes.len());
      text_start = pos;
      continue;
    }

    if let Some(stripped) = rest.strip_prefix("</") {
      let name_len = stripped.find(|c: char| !c.is_ascii_alphanumeric()).unwrap_or(stripped.len());
      if name_len == 0 {
        pos += 1;
        continue;
      }
      flush_text!(pos);
      let name = stripped[..name_len].to_ascii_lowercase();
      pos = rest.find('>').map(|i| pos + i + 1).unwrap_or(bytes.len());
      text_start = pos;
      close_element(&mut stack, &name);
      continue;
    }

    let name_len = rest[1..].find(|c: char| !c.is_ascii_alphanumeric()).unwrap_or(rest.len() - 1);
    if name_len == 0 || !rest.as_bytes()[1].is_ascii_alphabetic() {
      pos += 1;
      continue;
    }
    let Some(tag_len) = tag_end(rest) else {
      pos += 1;
      continue;
    };

    flush_text!(pos);
    let name = rest[1..1 + name_len].to_ascii_lowercase();
    let inner = &rest[1 + name_len..tag_len - 1];
    let self_closing = inner.trim_end().ends_with('/');
    let attrs = parse_attrs(inner);
    pos += tag_len;
    text_start = pos;

    implicit_close(&mut stack, &name);
    let el = Element::new(&name, attrs);

    if RAW_TEXT_TAGS.contains(&name.as_str()) {
      let close = format!("</{}", name);
      let lower = html[pos..].to_ascii_lowercase();
      let end = lower.find(&close).map(|i| pos + i).unwrap_or(bytes.len());
      pos = html[end..].find('>').map(|i| end + i + 1).unwrap_or(bytes.len());
      text_start = pos;
      append(&mut stack, el);
      continue;
    }

    if self_closing || VOID_TAGS.contains(&name.as_str()) {
      append(&mut stack, el);
    } else {
      // A newline right after <pre> is not content.
      if name == "pre" {
        for nl in ["\r\n", "\n"] {
          if html[pos..].starts_with(nl) {
            pos += nl.len();
            text_start = pos;
            break;
          }
        }
      }
      stack.push(el);
    }
  }
  flush_text!(bytes.len());

  while stack.len() > 1 {
    let el = stack.pop().unwrap_or_default();
    append(&mut stack, el);
  }
  stack.pop().unwrap_or_default()
}

/// Byte length of the start tag at the head of `rest`, honoring quoted attribute values.
fn tag_end(rest: &str) -> Option<usize> {
  let mut quote: Option<char> = None;
  for (i, c) in rest.char_indices().skip(1) {
    match (quote, c) {
      (Some(q), c) if c == q => quote = None,
      (Some(_), _) => {}
      (None, '"') | (None, '\'') => quote = Some(c),
      (None, '>') => return Some(i + 1),
      (None, '<') => return None,
      _ => {}
    }
  }
  None
}

fn parse_attrs(inner: &str) -> Vec<(String, String)> {
  ATTR_RE
    .captures_iter(inner)
    .map(|c| {
      let key = c.get(1).map(|m| m.as_str().to_ascii_lowercase()).unwrap_or_default();
      let raw = c.get(2).or_else(|| c.get(3)).or_else(|| c.get(4)).map(|m| m.as_str()).unwrap_or("");
      (key, decode_entities(raw))
    })
    .collect()
}

fn append(stack: &mut [Element], el: Element) {
  if let Some(top) = stack.last_mut() {
    top.children.push(Node::Element(el));
  }
}

fn close_element(stack: &mut Vec<Element>, name: &str) {
  let Some(idx) = stack.iter().rposition(|e| e.name == name) else {
    return;
  };
  if idx == 0 {
    return;
  }
  while stack.len() > idx {
    let el = stack.pop().unwrap_or_default();
    append(stack, el);
  }
}

/// Close elements that HTML closes implicitly when `name` opens.
fn implicit_close(stack: &mut Vec<Element>, name: &str) {
  let closes: &[&str] = match name {
    "p" => &["p"],
    "li" => &["li"],
    "tr" => &["td", "th", "tr"],
    "td" | "th" => &["td", "th"],
    "option" => &["option"],
    _ => return,
  };
  while stack.len() > 1 && stack.last().map(|e| closes.contains(&e.name.as_str())).unwrap_or(false) {
    let el = stack.pop().unwrap_or_default();
    append(stack, el);
  }
}

/// Decode numeric and named HTML5 character references.
pub fn decode_entities(s: &str) -> String {
  html_escape::decode_html_entities(s).into_owned()
}
