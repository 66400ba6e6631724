//! `lapio directive` command handler

use std::io::Write;
use std::path::Path;

use serde::Serialize;
use tracing::info;

use lapio_core::types::{Document, DocumentId, LogLine};
use lapio_ingest::directive::CompiledDirective;
use lapio_ingest::{DocumentBuilder, identity};

use crate::cli::{DirectiveAction, DirectiveArgs};
use crate::error::CliError;
use crate::output::{OutputWriter, Render};

/// Origin recorded in documents produced by `directive test`.
const DRY_RUN_ORIGIN: &str = "<command-line>";

/// Execute the `directive` command.
pub async fn execute(args: DirectiveArgs, writer: &OutputWriter) -> Result<(), CliError> {
    match args.action {
        DirectiveAction::Validate { path } => {
            let report = validate(&path).await?;
            writer.render(&report)
        }
        DirectiveAction::Test { path, line } => {
            let report = test_line(&path, &line).await?;
            writer.render(&report)?;
            if !report.matched {
                return Err(CliError::Command(
                    "line did not match any rule".to_owned(),
                ));
            }
            Ok(())
        }
    }
}

/// Load and compile a directive and describe its rules.
pub async fn validate(path: &Path) -> Result<DirectiveReport, CliError> {
    info!(path = %path.display(), "validating directive");
    let directive = CompiledDirective::load(path).await?;
    Ok(DirectiveReport::from_directive(path, &directive))
}

/// Classify one line without contacting a backend.
pub async fn test_line(path: &Path, line: &str) -> Result<MatchReport, CliError> {
    let directive = CompiledDirective::load(path).await?;
    let log_line = LogLine::new(line, 1, DRY_RUN_ORIGIN);

    let report = match directive.match_line(line) {
        Some(matched) => {
            let document = DocumentBuilder::from_directive(&directive).build(&matched, &log_line);
            MatchReport {
                directive: directive.name().to_owned(),
                matched: true,
                rule_index: Some(matched.rule_index),
                id: Some(identity::assign(line)),
                document: Some(document),
            }
        }
        None => MatchReport {
            directive: directive.name().to_owned(),
            matched: false,
            rule_index: None,
            id: None,
            document: None,
        },
    };
    Ok(report)
}

/// Compiled directive summary.
#[derive(Serialize)]
pub struct DirectiveReport {
    pub source: String,
    pub name: String,
    pub description: String,
    pub rules: Vec<RuleEntry>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_field: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_layout: Option<String>,
    pub warnings: Vec<String>,
}

/// One compiled rule.
#[derive(Serialize)]
pub struct RuleEntry {
    pub index: usize,
    pub expression: String,
    pub capture_groups: usize,
    pub pattern_groups: usize,
    pub fields: Vec<String>,
}

impl DirectiveReport {
    pub fn from_directive(path: &Path, directive: &CompiledDirective) -> Self {
        let rules: Vec<RuleEntry> = directive
            .rules()
            .iter()
            .map(|rule| RuleEntry {
                index: rule.index(),
                expression: rule.as_str().to_owned(),
                capture_groups: rule.expected_fields(),
                pattern_groups: rule.pattern_groups(),
                fields: rule.field_names().to_vec(),
            })
            .collect();

        let mut warnings: Vec<String> = directive
            .unreachable_rules()
            .into_iter()
            .filter_map(|idx| rules.get(idx))
            .map(|rule| {
                format!(
                    "rule {} declares {} capture group(s) but its pattern has {}; it can never match",
                    rule.index, rule.capture_groups, rule.pattern_groups
                )
            })
            .collect();

        if let Some(time) = directive.time_mapping() {
            let declared = rules.iter().any(|r| r.fields.iter().any(|f| *f == time.field));
            if !declared {
                warnings.push(format!(
                    "time field '{}' is not a named group of any rule",
                    time.field
                ));
            }
        }

        Self {
            source: path.display().to_string(),
            name: directive.name().to_owned(),
            description: directive.description().to_owned(),
            rules,
            time_field: directive.time_mapping().map(|t| t.field.clone()),
            time_layout: directive.time_mapping().map(|t| t.layout.clone()),
            warnings,
        }
    }
}

impl Render for DirectiveReport {
    fn render_text(&self, w: &mut dyn Write) -> std::io::Result<()> {
        use colored::Colorize;

        writeln!(w, "Directive: {} ({})", self.name.bold(), self.source)?;
        if !self.description.is_empty() {
            writeln!(w, "  {}", self.description)?;
        }
        if let (Some(field), Some(layout)) = (&self.time_field, &self.time_layout) {
            writeln!(w, "  Time: {field} ({layout})")?;
        }
        writeln!(w, "  Rules: {}", self.rules.len())?;
        for rule in &self.rules {
            writeln!(
                w,
                "    [{}] groups={} fields={}  {}",
                rule.index,
                rule.capture_groups,
                rule.fields.join(","),
                rule.expression
            )?;
        }
        if self.warnings.is_empty() {
            writeln!(w, "  Result: {}", "VALID".green().bold())?;
        } else {
            writeln!(w, "  Result: {}", "VALID (with warnings)".yellow().bold())?;
            for warning in &self.warnings {
                writeln!(w, "  Warning: {}", warning.yellow())?;
            }
        }
        Ok(())
    }
}

/// Dry-run classification result.
#[derive(Serialize)]
pub struct MatchReport {
    pub directive: String,
    pub matched: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rule_index: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<DocumentId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub document: Option<Document>,
}

impl Render for MatchReport {
    fn render_text(&self, w: &mut dyn Write) -> std::io::Result<()> {
        use colored::Colorize;

        match (self.rule_index, &self.document) {
            (Some(idx), Some(doc)) => {
                writeln!(w, "{} rule {} of '{}'", "MATCH".green().bold(), idx, self.directive)?;
                if let Some(ref id) = self.id {
                    writeln!(w, "  _id: {id}")?;
                }
                for (key, value) in doc.iter() {
                    writeln!(w, "  {key}: {value}")?;
                }
            }
            _ => {
                writeln!(
                    w,
                    "{} no rule of '{}' matched; the line would go to the error file",
                    "NO MATCH".red().bold(),
                    self.directive
                )?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lapio_ingest::directive::DirectiveLoader;

    fn compile(yaml: &str) -> CompiledDirective {
        let def = DirectiveLoader::parse_yaml(yaml, "t.yml").unwrap();
        CompiledDirective::compile(def).unwrap()
    }

    #[test]
    fn test_report_flags_unreachable_rule() {
        let directive = compile(
            "name: t\nregexes:\n  - expression: '^(?P<a>\\w+) (?P<b>\\w+)$'\n    capture_groups: 3\n  - expression: '^(?P<a>\\w+)$'\n    capture_groups: 1\n",
        );
        let report = DirectiveReport::from_directive(Path::new("t.yml"), &directive);
        assert_eq!(report.rules.len(), 2);
        assert_eq!(report.warnings.len(), 1);
        assert!(report.warnings[0].contains("rule 0"));
    }

    #[test]
    fn test_report_flags_undeclared_time_field() {
        let directive = compile(
            "name: t\nregexes:\n  - expression: '^(?P<a>\\w+)$'\n    capture_groups: 1\ntime:\n  field: ts\n  layout: '%Y'\n",
        );
        let report = DirectiveReport::from_directive(Path::new("t.yml"), &directive);
        assert_eq!(report.time_field.as_deref(), Some("ts"));
        assert!(report.warnings.iter().any(|w| w.contains("'ts'")));
    }

    #[test]
    fn test_match_report_renders_fields_in_order() {
        let mut doc = Document::new();
        doc.insert("message", "a b");
        doc.insert("log_origin", DRY_RUN_ORIGIN);
        doc.insert("x", "a");
        let report = MatchReport {
            directive: "t".to_owned(),
            matched: true,
            rule_index: Some(0),
            id: Some(identity::assign("a b")),
            document: Some(doc),
        };

        let mut buffer = Vec::new();
        report.render_text(&mut buffer).unwrap();
        let output = String::from_utf8(buffer).unwrap();
        let message = output.find("message: a b").expect("message rendered");
        let field = output.find("x: a").expect("field rendered");
        assert!(message < field);
    }

    #[test]
    fn test_match_report_json_skips_absent_parts() {
        let report = MatchReport {
            directive: "t".to_owned(),
            matched: false,
            rule_index: None,
            id: None,
            document: None,
        };
        let json: serde_json::Value =
            serde_json::from_str(&serde_json::to_string(&report).unwrap()).unwrap();
        assert_eq!(json["matched"], false);
        assert!(json.get("document").is_none());
    }
}
