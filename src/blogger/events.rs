//! 编排过程事件：每一步先推送占位提示，再推送该面板的最终内容（或空内容说明）

use serde::Serialize;

/// 三个展示面板对应的步骤
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Draft,
    Critique,
    Revision,
}

impl Stage {
    pub fn running_text(self) -> &'static str {
        match self {
            Stage::Draft => "**Step 1: 生成初始内容...**",
            Stage::Critique => "**Step 2: 批评者正在提供反馈和文献推荐...**",
            Stage::Revision => "**Step 3: 根据反馈改进内容...**",
        }
    }

    pub fn completed_text(self, content: &str) -> String {
        let title = match self {
            Stage::Draft => "生成的初始内容",
            Stage::Critique => "批评和文献推荐",
            Stage::Revision => "最终优化的博客内容",
        };
        format!("**{title}**:\n\n{content}")
    }

    pub fn empty_text(self) -> &'static str {
        match self {
            Stage::Draft => "**生成的初始内容为空，请检查生成逻辑。**",
            Stage::Critique => "**批评内容为空，请检查批评逻辑。**",
            Stage::Revision => "**最终优化的博客内容为空，请检查生成逻辑。**",
        }
    }
}

/// 单步事件（可序列化为 JSON 供前端展示）
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BloggerEvent {
    /// 步骤开始，面板显示占位提示
    StageStarted { stage: Stage, text: String },
    /// 步骤完成，面板显示内容
    StageCompleted { stage: Stage, text: String },
    /// 步骤产出为空，面板显示说明
    StageEmpty { stage: Stage, text: String },
    /// 传输错误，生成中断
    Error { text: String },
}

impl BloggerEvent {
    pub fn started(stage: Stage) -> Self {
        BloggerEvent::StageStarted {
            stage,
            text: stage.running_text().to_string(),
        }
    }

    /// 面板最终内容：content 为空时给出说明
    pub fn finished(stage: Stage, content: &str) -> Self {
        if content.is_empty() {
            BloggerEvent::StageEmpty {
                stage,
                text: stage.empty_text().to_string(),
            }
        } else {
            BloggerEvent::StageCompleted {
                stage,
                text: stage.completed_text(content),
            }
        }
    }

    /// 是否为面板最终更新（completed / empty）
    pub fn is_panel_update(&self) -> bool {
        matches!(
            self,
            BloggerEvent::StageCompleted { .. } | BloggerEvent::StageEmpty { .. }
        )
    }

    pub fn stage(&self) -> Option<Stage> {
        match self {
            BloggerEvent::StageStarted { stage, .. }
            | BloggerEvent::StageCompleted { stage, .. }
            | BloggerEvent::StageEmpty { stage, .. } => Some(*stage),
            BloggerEvent::Error { .. } => None,
        }
    }
}
