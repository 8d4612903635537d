// Copyright 2026 The Parapet Project
// SPDX-License-Identifier: Apache-2.0

// System prompt construction and input cleanup.
//
// The session treats the prompt as an opaque string; this module only
// assembles it from the configured language, limits and diagram type.

use crate::config::{PromptConfig, PromptLanguage};

/// Requested diagram type (`diagramType` in the request body).
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum DiagramType {
    /// Let the model pick flowchart, sequence or class.
    #[default]
    Auto,
    Flowchart,
    Sequence,
    Class,
    /// Any other Mermaid diagram keyword, passed through verbatim.
    Other(String),
}

impl DiagramType {
    pub fn parse(value: Option<&str>) -> Self {
        match value.map(str::trim) {
            None | Some("") | Some("auto") => Self::Auto,
            Some("flowchart") => Self::Flowchart,
            Some("sequence") => Self::Sequence,
            Some("class") => Self::Class,
            Some(other) => Self::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Auto => "auto",
            Self::Flowchart => "flowchart",
            Self::Sequence => "sequence",
            Self::Class => "class",
            Self::Other(name) => name,
        }
    }
}

/// Produces the system prompt sent upstream.
pub trait PromptBuilder: Send + Sync {
    fn system_prompt(&self, diagram_type: &DiagramType) -> String;
}

/// Mermaid prompt template in Chinese or English.
pub struct MermaidPromptBuilder {
    config: PromptConfig,
}

impl MermaidPromptBuilder {
    pub fn new(config: PromptConfig) -> Self {
        Self { config }
    }
}

impl PromptBuilder for MermaidPromptBuilder {
    fn system_prompt(&self, diagram_type: &DiagramType) -> String {
        let text = match self.config.language {
            PromptLanguage::Zh => &ZH,
            PromptLanguage::En => &EN,
        };
        let direction = self.config.flow_direction.as_str();

        let type_rule = match diagram_type {
            DiagramType::Auto => text.type_auto.to_string(),
            other => text.type_fixed.replace("{type}", other.as_str()),
        };
        let syntax = text.syntax.replace("{dir}", direction);
        let style = text
            .style
            .replace("{nodes}", &self.config.max_nodes.to_string())
            .replace("{edges}", &self.config.max_edges.to_string());
        let examples = text.examples.replace("{dir}", direction);

        [
            text.titles[0],
            text.goals,
            "",
            text.titles[1],
            type_rule.as_str(),
            "",
            text.titles[2],
            syntax.as_str(),
            "",
            text.titles[3],
            style.as_str(),
            "",
            text.titles[4],
            text.output,
            "",
            text.titles[5],
            text.self_check,
            "",
            text.titles[6],
            examples.as_str(),
        ]
        .join("\n")
    }
}

/// Collapse whitespace runs to single spaces and trim.
pub fn clean_text(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

// ---------------------------------------------------------------------------
// Templates
// ---------------------------------------------------------------------------

struct PromptText {
    titles: [&'static str; 7],
    goals: &'static str,
    type_auto: &'static str,
    type_fixed: &'static str,
    syntax: &'static str,
    style: &'static str,
    output: &'static str,
    self_check: &'static str,
    examples: &'static str,
}

const EN: PromptText = PromptText {
    titles: [
        "Goals",
        "Diagram Type Rule",
        "Syntax & Escaping",
        "Style & Complexity",
        "Output Contract",
        "Self-checklist",
        "Examples",
    ],
    goals: "Goals:\n- Map user input into a compilable Mermaid diagram.\n- Cover key entities/steps and relations; keep it clear and readable.",
    type_auto: "Diagram type:\n- Choose exactly one best fit: flowchart, sequence, or class.",
    type_fixed: "Diagram type:\n- You MUST use type {type} (do not switch types).",
    syntax: "Syntax & Escaping:
- Node IDs contain no spaces/special chars; show text inside brackets.
- Each node must be defined independently and completely, one per line.
  Format: NodeID[NodeText]
  Wrong: A[Node1 B[Node2]  (connected, missing closure)
  Wrong: A[Node1]B[Node2]  (multiple nodes on same line)
  Correct:
    A[Node1]
    B[Node2]
    A --> B
- HTML special chars < > & # must be HTML-encoded (&lt; &gt; &amp; &#35;).
- Use %% for comments; edge labels use |label| syntax.
- If using flowchart, default direction is {dir} (e.g., flowchart {dir}).",
    style: "Style & Complexity:\n- Up to {nodes} nodes and {edges} edges; if exceeded, abstract/group with subgraph.\n- For color/hierarchy, use classDef/class:\n  Example:\n  classDef group fill:#eef,stroke:#55f;\n  class A,B group",
    output: "Output contract (strict):\n- Output exactly one fenced code block labeled mermaid (```mermaid ... ```).\n- No extra text, explanations, or wrappers.",
    self_check: "Self-check (do not output):\n- Are key entities/steps covered and relations complete?\n- Does it compile as Mermaid? Exactly one mermaid fenced code?",
    examples: "Examples (minimal):
- flowchart:
```mermaid
flowchart {dir}
A[Start] --> B[Process]
B --> C{Branch}
C -->|Yes| D[Success]
C -->|No| E[Fail]
```
- sequence:
```mermaid
sequenceDiagram
Alice->>Bob: Request
Bob-->>Alice: Response
```",
};

const ZH: PromptText = PromptText {
    titles: [
        "目的与目标",
        "图类型规则",
        "语法与转义",
        "风格与复杂度",
        "输出格式",
        "自检清单",
        "示例",
    ],
    goals: "目的与目标：\n- 将用户输入准确映射为可编译的 Mermaid 图。\n- 覆盖关键实体/步骤与关系，保持清晰、可读、无冗余。",
    type_auto: "图类型：\n- 根据内容选择最合适的一种：flowchart、sequence 或 class（仅一种）。",
    type_fixed: "图类型：\n- 必须使用 {type} 类型（不得更换类型）。",
    syntax: "语法与转义：
- 节点 ID 不包含空格与特殊字符；展示文本使用方括号包裹。
- 每个节点必须独立完整定义，每行只能定义一个节点。
  格式：节点ID[节点文本]
  错误：A[节点1 B[节点2]  （连写，缺少闭合）
  错误：A[节点1]B[节点2]  （同行多个节点）
  正确：
    A[节点1]
    B[节点2]
    A --> B
- HTML 特殊字符 < > & # 使用实体编码（&lt; &gt; &amp; &#35;）。
- 使用 %% 表示注释；边标签使用 |label| 语法。
- 若使用 flowchart，默认方向为 {dir}（示例：flowchart {dir}）。",
    style: "风格与复杂度：\n- 节点不超过 {nodes} 个、边不超过 {edges} 条；超限请抽象/分组（subgraph）。\n- 如需颜色/层级区分，应使用 classDef/class：\n  示例：\n  classDef group fill:#eef,stroke:#55f;\n  class A,B group",
    output: "输出格式（严格）：\n- 仅输出一个以 mermaid 标注的 fenced code block（```mermaid 开始，``` 结束）。\n- 不得包含任何额外文字、解释或前后缀。",
    self_check: "自检（不要输出自检过程）：\n- 关键实体/步骤是否覆盖？主要关系是否完整？\n- Mermaid 语法是否可编译？是否只包含一个 mermaid fenced code？",
    examples: "示例（极简）：
- flowchart：
```mermaid
flowchart {dir}
A[开始] --> B[处理]
B --> C{分支}
C -->|是| D[成功]
C -->|否| E[失败]
```
- sequence：
```mermaid
sequenceDiagram
Alice->>Bob: 请求
Bob-->>Alice: 响应
```",
};

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::FlowDirection;

    fn config(language: PromptLanguage) -> PromptConfig {
        PromptConfig {
            language,
            max_nodes: 12,
            max_edges: 30,
            flow_direction: FlowDirection::LeftRight,
        }
    }

    #[test]
    fn clean_text_collapses_whitespace() {
        assert_eq!(clean_text("  a\n\n b\t\tc  "), "a b c");
        assert_eq!(clean_text("   "), "");
    }

    #[test]
    fn diagram_type_parsing() {
        assert_eq!(DiagramType::parse(None), DiagramType::Auto);
        assert_eq!(DiagramType::parse(Some("auto")), DiagramType::Auto);
        assert_eq!(DiagramType::parse(Some("sequence")), DiagramType::Sequence);
        assert_eq!(
            DiagramType::parse(Some("gantt")),
            DiagramType::Other("gantt".into())
        );
    }

    #[test]
    fn english_prompt_fills_limits_direction_and_type() {
        let builder = MermaidPromptBuilder::new(config(PromptLanguage::En));
        let prompt = builder.system_prompt(&DiagramType::Class);
        assert!(prompt.contains("You MUST use type class"));
        assert!(prompt.contains("Up to 12 nodes and 30 edges"));
        assert!(prompt.contains("flowchart LR"));
        assert!(prompt.contains("```mermaid"));
        assert!(!prompt.contains("{dir}"));
    }

    #[test]
    fn auto_type_lets_model_choose() {
        let builder = MermaidPromptBuilder::new(config(PromptLanguage::En));
        let prompt = builder.system_prompt(&DiagramType::Auto);
        assert!(prompt.contains("Choose exactly one best fit"));
    }

    #[test]
    fn chinese_prompt_uses_chinese_sections() {
        let builder = MermaidPromptBuilder::new(config(PromptLanguage::Zh));
        let prompt = builder.system_prompt(&DiagramType::Flowchart);
        assert!(prompt.starts_with("目的与目标"));
        assert!(prompt.contains("必须使用 flowchart 类型"));
        assert!(prompt.contains("节点不超过 12 个"));
    }
}
