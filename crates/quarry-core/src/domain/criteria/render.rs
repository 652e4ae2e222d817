//! Human readable rendering of criteria trees
//!
//! Rendering works on a display list built by [`modify_criteria`]: every
//! condition becomes a group whose children are interleaved with junction
//! markers, `[child0, AND, child1, AND, child2]`. Rules render as
//! `field operator v1, v2`, markers as the junction keyword and nested groups
//! in parentheses.

use crossterm::style::{StyledContent, Stylize, style};
use serde::{Deserialize, Serialize};

use super::entity::{Condition, CriteriaNode, Junction, Rule};

/// Output flavour of the renderer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RenderFormat {
    /// Plain text
    #[default]
    Plain,
    /// Text with ANSI color codes for terminals
    Ansi,
    /// HTML spans with escaped content
    Html,
}

impl RenderFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Plain => "plain",
            Self::Ansi => "ansi",
            Self::Html => "html",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "plain" | "text" => Some(Self::Plain),
            "ansi" | "color" => Some(Self::Ansi),
            "html" => Some(Self::Html),
            _ => None,
        }
    }
}

impl std::fmt::Display for RenderFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Options for rendering a tree
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderOptions {
    /// Spaces per nesting level when beautified
    pub indent_width: usize,
    /// One item per line instead of a single line
    pub beautify: bool,
    pub format: RenderFormat,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            indent_width: 2,
            beautify: false,
            format: RenderFormat::Plain,
        }
    }
}

impl RenderOptions {
    pub fn with_indent_width(mut self, indent_width: usize) -> Self {
        self.indent_width = indent_width;
        self
    }

    pub fn with_beautify(mut self, beautify: bool) -> Self {
        self.beautify = beautify;
        self
    }

    pub fn with_format(mut self, format: RenderFormat) -> Self {
        self.format = format;
        self
    }
}

/// Entry of a display list
#[derive(Debug, Clone, PartialEq)]
pub enum DisplayItem<'a> {
    Rule(&'a Rule),
    Marker(Junction),
    Group(Vec<DisplayItem<'a>>),
}

/// Display list of `condition` with junction markers between siblings
///
/// Conditions without rules contribute nothing and get no marker.
pub fn modify_criteria(condition: &Condition) -> Vec<DisplayItem<'_>> {
    let children = condition.rules.iter().filter_map(|child| match child {
        CriteriaNode::Rule(rule) => Some(DisplayItem::Rule(rule)),
        CriteriaNode::Condition(inner) => {
            let items = modify_criteria(inner);
            (!items.is_empty()).then_some(DisplayItem::Group(items))
        }
    });

    let mut items = Vec::new();
    for child in children {
        if !items.is_empty() {
            items.push(DisplayItem::Marker(condition.condition));
        }
        items.push(child);
    }
    items
}

#[derive(Debug, Clone, Copy)]
enum Part {
    Field,
    Operator,
    Value,
    Junction,
}

impl Part {
    fn styled<'a>(&self, text: &'a str) -> StyledContent<&'a str> {
        match self {
            Self::Field => style(text).cyan(),
            Self::Operator => style(text).yellow(),
            Self::Value => style(text).green(),
            Self::Junction => style(text).magenta().bold(),
        }
    }

    fn css_class(&self) -> &'static str {
        match self {
            Self::Field => "criteria-field",
            Self::Operator => "criteria-operator",
            Self::Value => "criteria-value",
            Self::Junction => "criteria-condition",
        }
    }
}

fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

/// Renders criteria trees as text
#[derive(Debug, Clone)]
pub struct CriteriaRenderer {
    options: RenderOptions,
    and_label: String,
    or_label: String,
}

impl CriteriaRenderer {
    pub fn new(options: RenderOptions) -> Self {
        Self {
            options,
            and_label: Junction::And.as_str().to_string(),
            or_label: Junction::Or.as_str().to_string(),
        }
    }

    /// Replace the junction keywords, e.g. with translated labels
    pub fn with_junction_labels(mut self, and: impl Into<String>, or: impl Into<String>) -> Self {
        self.and_label = and.into();
        self.or_label = or.into();
        self
    }

    pub fn options(&self) -> &RenderOptions {
        &self.options
    }

    pub fn render(&self, tree: &Condition) -> String {
        let items = modify_criteria(tree);
        let mut lines = Vec::new();
        self.render_items(&items, 0, &mut lines);

        if self.options.beautify {
            lines.join(self.line_break())
        } else {
            lines.join(" ")
        }
    }

    fn render_items(&self, items: &[DisplayItem<'_>], depth: usize, out: &mut Vec<String>) {
        for item in items {
            match item {
                DisplayItem::Rule(rule) => out.push(self.indented(depth, self.render_rule(rule))),
                DisplayItem::Marker(junction) => {
                    let label = self.paint(Part::Junction, self.junction_label(*junction));
                    out.push(self.indented(depth, label));
                }
                DisplayItem::Group(inner) => {
                    if self.options.beautify {
                        out.push(self.indented(depth, "(".to_string()));
                        self.render_items(inner, depth + 1, out);
                        out.push(self.indented(depth, ")".to_string()));
                    } else {
                        let mut nested = Vec::new();
                        self.render_items(inner, depth + 1, &mut nested);
                        out.push(format!("({})", nested.join(" ")));
                    }
                }
            }
        }
    }

    fn render_rule(&self, rule: &Rule) -> String {
        let mut text = format!(
            "{} {}",
            self.paint(Part::Field, &rule.field),
            self.paint(Part::Operator, &rule.operator)
        );
        let values = rule.value.values();
        if !values.is_empty() {
            text.push(' ');
            text.push_str(&self.paint(Part::Value, &values.join(", ")));
        }
        text
    }

    fn junction_label(&self, junction: Junction) -> &str {
        match junction {
            Junction::And => &self.and_label,
            Junction::Or => &self.or_label,
        }
    }

    fn paint(&self, part: Part, text: &str) -> String {
        match self.options.format {
            RenderFormat::Plain => text.to_string(),
            RenderFormat::Ansi => part.styled(text).to_string(),
            RenderFormat::Html => {
                format!("<span class=\"{}\">{}</span>", part.css_class(), escape_html(text))
            }
        }
    }

    fn indented(&self, depth: usize, text: String) -> String {
        if !self.options.beautify {
            return text;
        }
        let unit = match self.options.format {
            RenderFormat::Html => "&nbsp;",
            RenderFormat::Plain | RenderFormat::Ansi => " ",
        };
        format!("{}{}", unit.repeat(depth * self.options.indent_width), text)
    }

    fn line_break(&self) -> &'static str {
        match self.options.format {
            RenderFormat::Html => "<br>\n",
            RenderFormat::Plain | RenderFormat::Ansi => "\n",
        }
    }
}

/// Render `tree` with the given options and the plain junction keywords
pub fn stringify_criteria(tree: &Condition, options: &RenderOptions) -> String {
    CriteriaRenderer::new(options.clone()).render(tree)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::criteria::entity::NodeId;

    fn rule(field: &str, operator: &str, value: Vec<&str>) -> CriteriaNode {
        Rule::new(NodeId::from(field), field, "object", operator, value).into()
    }

    fn condition(junction: Junction, rules: Vec<CriteriaNode>) -> Condition {
        Condition::new(NodeId::from("c"), junction, rules)
    }

    #[test]
    fn test_single_rule() {
        let tree = condition(Junction::And, vec![rule("prop1", "equals", vec!["v1", "v2"])]);
        let text = stringify_criteria(&tree, &RenderOptions::default());
        assert!(text.contains("prop1 equals v1, v2"));
    }

    #[test]
    fn test_markers_between_siblings() {
        let tree = condition(
            Junction::Or,
            vec![
                rule("a", "equals", vec!["1"]),
                rule("b", "equals", vec!["2"]),
                rule("c", "equals", vec!["3"]),
            ],
        );

        let items = modify_criteria(&tree);
        assert_eq!(items.len(), 5);
        assert_eq!(items[1], DisplayItem::Marker(Junction::Or));
        assert_eq!(items[3], DisplayItem::Marker(Junction::Or));

        assert_eq!(
            stringify_criteria(&tree, &RenderOptions::default()),
            "a equals 1 OR b equals 2 OR c equals 3"
        );
    }

    #[test]
    fn test_nested_groups_in_parentheses() {
        let inner = condition(
            Junction::Or,
            vec![rule("b", "equals", vec!["2"]), rule("c", "equals", vec!["3"])],
        );
        let tree = condition(Junction::And, vec![rule("a", "equals", vec!["1"]), inner.into()]);

        assert_eq!(
            stringify_criteria(&tree, &RenderOptions::default()),
            "a equals 1 AND (b equals 2 OR c equals 3)"
        );
    }

    #[test]
    fn test_empty_groups_are_skipped() {
        let empty = condition(Junction::And, Vec::new());
        let tree = condition(Junction::Or, vec![empty.into(), rule("a", "equals", vec!["1"])]);
        assert_eq!(stringify_criteria(&tree, &RenderOptions::default()), "a equals 1");
    }

    #[test]
    fn test_rule_without_value() {
        let tree = condition(Junction::And, vec![rule("a", "set_to", Vec::new())]);
        assert_eq!(stringify_criteria(&tree, &RenderOptions::default()), "a set_to");
    }

    #[test]
    fn test_beautify_indents_per_level() {
        let inner = condition(
            Junction::Or,
            vec![rule("b", "equals", vec!["2"]), rule("c", "equals", vec!["3"])],
        );
        let tree = condition(Junction::And, vec![rule("a", "equals", vec!["1"]), inner.into()]);
        let options = RenderOptions::default().with_beautify(true).with_indent_width(4);

        let text = stringify_criteria(&tree, &options);
        let lines: Vec<_> = text.lines().collect();
        assert_eq!(
            lines,
            vec!["a equals 1", "AND", "(", "    b equals 2", "    OR", "    c equals 3", ")"]
        );
    }

    #[test]
    fn test_ansi_format() {
        let tree = condition(
            Junction::And,
            vec![rule("a", "equals", vec!["1"]), rule("b", "equals", vec!["2"])],
        );
        let options = RenderOptions::default().with_format(RenderFormat::Ansi);
        let text = stringify_criteria(&tree, &options);

        assert!(text.contains(&"a".cyan().to_string()));
        assert!(text.contains(&"equals".yellow().to_string()));
        assert!(text.contains(&"1".green().to_string()));
        assert!(text.contains(&"AND".magenta().bold().to_string()));
        assert_ne!(text, stringify_criteria(&tree, &RenderOptions::default()));
    }

    #[test]
    fn test_html_format_escapes() {
        let tree = condition(Junction::And, vec![rule("title", "contains", vec!["<b>&"])]);
        let options = RenderOptions::default().with_format(RenderFormat::Html);
        let text = stringify_criteria(&tree, &options);
        assert!(text.contains("<span class=\"criteria-value\">&lt;b&gt;&amp;</span>"));
        assert!(!text.contains("<b>"));
    }

    #[test]
    fn test_junction_labels() {
        let tree = condition(
            Junction::And,
            vec![rule("a", "equals", vec!["1"]), rule("b", "equals", vec!["2"])],
        );
        let renderer =
            CriteriaRenderer::new(RenderOptions::default()).with_junction_labels("und", "oder");
        assert_eq!(renderer.render(&tree), "a equals 1 und b equals 2");
    }

    #[test]
    fn test_format_parse() {
        assert_eq!(RenderFormat::parse("HTML"), Some(RenderFormat::Html));
        assert_eq!(RenderFormat::parse("plain"), Some(RenderFormat::Plain));
        assert_eq!(RenderFormat::parse("svg"), None);
    }
}
