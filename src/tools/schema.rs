//! 插件调用 JSON Schema 生成（schemars）
//!
//! 写入插件 prompt，约束 LLM 在 `<|action_start|><|plugin|>` 与 `<|action_end|>` 之间输出的 JSON 结构。

use std::collections::HashMap;

use schemars::{schema_for, JsonSchema};

/// 插件调用格式：与 PluginParser 解析的 `{"name": "...", "parameters": {...}}` 一致（仅用于 Schema 生成）
#[allow(dead_code)]
#[derive(JsonSchema)]
struct PluginCallFormat {
    /// 工具名，如 ArxivSearch、WeatherQuery
    pub name: String,
    /// 工具参数，如 {"query": "..."}
    pub parameters: HashMap<String, String>,
}

/// 返回插件调用的 JSON Schema 字符串，可拼入 system prompt
pub fn plugin_call_schema_json() -> String {
    let schema = schema_for!(PluginCallFormat);
    serde_json::to_string_pretty(&schema).unwrap_or_default()
}
