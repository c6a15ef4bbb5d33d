// === Module Header (agents-tooling) START ===
// header: Parsed by scripts/check_module_headers.sh for purpose/role presence; keep keys on single-line entries.
// purpose: Group the network seams: the source tracker (summary CSV, detail pages, downloads) and the Gist publisher
// role: module/aggregation
// outputs: IssueSource and GistApi traits with their ureq-backed implementations
// invariants: All network access in the crate goes through these traits so tests can substitute fakes
// tie_breakers: contracts > orchestration > correctness > performance > minimal_diffs
// === Module Header END ===

pub mod github_api;
pub mod google_code;

pub use github_api::{GistApi, GistHttpApi};
pub use google_code::{GoogleCodeHttp, IssueSource, SummaryRow};

pub const USER_AGENT: &str = "gcode-issue-export";
