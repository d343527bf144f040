//! 工具箱：arXiv 文献检索、和风天气查询，以及工具注册表与插件调用 Schema

pub mod arxiv;
pub mod registry;
pub mod schema;
pub mod weather;

pub use arxiv::{ArxivPaper, ArxivSearch, LiteratureSearch};
pub use registry::{Tool, ToolError, ToolRegistry};
pub use schema::plugin_call_schema_json;
pub use weather::WeatherQuery;
