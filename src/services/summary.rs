//! Output summarization
//!
//! Pure text-to-structure extraction over captured tofu output. No side
//! effects, deterministic. The primary extractor walks an ordered table of
//! known line patterns; the secondary extractor produces a presentation
//! level breakdown used only for plan rendering.

use regex::{Captures, Regex};
use std::sync::LazyLock;

use crate::domain::summary::{ChangeAction, PlanBreakdown, ResourceChange, Summary};

type SummaryBuilder = fn(&Captures) -> Option<Summary>;

/// Ordered (pattern, shape) table. Tried in sequence per line, first match
/// wins and the scan stops.
static SUMMARY_PATTERNS: LazyLock<Vec<(Regex, SummaryBuilder)>> = LazyLock::new(|| {
    vec![
        (
            Regex::new(r"Plan: (\d+) to add, (\d+) to change, (\d+) to destroy").unwrap(),
            (|caps| {
                Some(Summary::Plan {
                    to_add: num(caps, 1)?,
                    to_change: num(caps, 2)?,
                    to_destroy: num(caps, 3)?,
                })
            }) as SummaryBuilder,
        ),
        (
            Regex::new(r"Apply complete! Resources: (\d+) added, (\d+) changed, (\d+) destroyed")
                .unwrap(),
            (|caps| {
                Some(Summary::Apply {
                    added: num(caps, 1)?,
                    changed: num(caps, 2)?,
                    destroyed: num(caps, 3)?,
                })
            }) as SummaryBuilder,
        ),
        (
            Regex::new(r"Destroy complete! Resources: (\d+) destroyed").unwrap(),
            (|caps| {
                Some(Summary::Destroy {
                    destroyed: num(caps, 1)?,
                })
            }) as SummaryBuilder,
        ),
    ]
});

/// Resource declaration line inside a plan, e.g.
/// `  + resource "null_resource" "workers" {`
static RESOURCE_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"^\s*([+~-])\s*resource\s+"([^"]+)"\s+"([^"]+)""#).unwrap());

/// Canonical phrase tofu prints when a plan finds nothing to do
const NO_CHANGES_PHRASE: &str = "No changes.";

fn num(caps: &Captures, index: usize) -> Option<u32> {
    caps.get(index)?.as_str().parse().ok()
}

/// Extract the primary summary from captured output.
///
/// Lines are scanned in order; the first line matching any table entry
/// produces the result and ends the scan. No match yields `None`, never a
/// zero-valued record.
pub fn extract_summary(text: &str) -> Option<Summary> {
    for line in text.lines() {
        for (pattern, build) in SUMMARY_PATTERNS.iter() {
            if let Some(caps) = pattern.captures(line) {
                return build(&caps);
            }
        }
    }
    None
}

/// Extract the presentation-level plan breakdown.
///
/// Independent of the primary summary and may coexist with it: collects the
/// tally if present, every resource declaration change in order, and whether
/// the output states there is nothing to change.
pub fn extract_plan_breakdown(text: &str) -> PlanBreakdown {
    let mut resource_changes = Vec::new();

    for line in text.lines() {
        if let Some(caps) = RESOURCE_LINE.captures(line) {
            let marker = caps[1].chars().next().unwrap_or(' ');
            if let Some(action) = ChangeAction::from_marker(marker) {
                resource_changes.push(ResourceChange {
                    action,
                    resource_type: caps[2].to_string(),
                    name: caps[3].to_string(),
                });
            }
        }
    }

    PlanBreakdown {
        summary: extract_summary(text),
        resource_changes,
        no_changes: text.contains(NO_CHANGES_PHRASE),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plan_summary_shape() {
        let text = "Refreshing state...\nPlan: 3 to add, 1 to change, 2 to destroy\n";
        assert_eq!(
            extract_summary(text),
            Some(Summary::Plan {
                to_add: 3,
                to_change: 1,
                to_destroy: 2
            })
        );
    }

    #[test]
    fn test_apply_summary_shape() {
        let text = "Apply complete! Resources: 5 added, 0 changed, 1 destroyed";
        assert_eq!(
            extract_summary(text),
            Some(Summary::Apply {
                added: 5,
                changed: 0,
                destroyed: 1
            })
        );
    }

    #[test]
    fn test_destroy_summary_shape() {
        let text = "Destroy complete! Resources: 4 destroyed";
        assert_eq!(extract_summary(text), Some(Summary::Destroy { destroyed: 4 }));
    }

    #[test]
    fn test_no_match_yields_absent_summary() {
        assert_eq!(extract_summary(""), None);
        assert_eq!(extract_summary("Initializing the backend...\nDone.\n"), None);
    }

    #[test]
    fn test_first_matching_line_wins() {
        // plan 行在前，后续的 apply 行不再参与
        let text = "Plan: 1 to add, 0 to change, 0 to destroy\n\
                    Apply complete! Resources: 1 added, 0 changed, 0 destroyed\n";
        assert_eq!(
            extract_summary(text),
            Some(Summary::Plan {
                to_add: 1,
                to_change: 0,
                to_destroy: 0
            })
        );
    }

    #[test]
    fn test_breakdown_collects_changes_in_order() {
        let text = r#"
Terraform will perform the following actions:

  + resource "aws_instance" "web" {
      + ami = "ami-123"
    }

  ~ resource "aws_security_group" "allow" {
    }

  - resource "null_resource" "legacy" {
    }

Plan: 1 to add, 1 to change, 1 to destroy
"#;
        let breakdown = extract_plan_breakdown(text);
        assert_eq!(breakdown.resource_changes.len(), 3);
        assert_eq!(breakdown.resource_changes[0].action, ChangeAction::Create);
        assert_eq!(breakdown.resource_changes[0].resource_type, "aws_instance");
        assert_eq!(breakdown.resource_changes[0].name, "web");
        assert_eq!(breakdown.resource_changes[1].action, ChangeAction::Update);
        assert_eq!(breakdown.resource_changes[2].action, ChangeAction::Delete);
        assert!(!breakdown.no_changes);
        assert_eq!(
            breakdown.summary,
            Some(Summary::Plan {
                to_add: 1,
                to_change: 1,
                to_destroy: 1
            })
        );
    }

    #[test]
    fn test_breakdown_no_changes_flag() {
        let text = "No changes. Your infrastructure matches the configuration.";
        let breakdown = extract_plan_breakdown(text);
        assert!(breakdown.no_changes);
        assert!(breakdown.resource_changes.is_empty());
        assert!(breakdown.summary.is_none());
    }
}
