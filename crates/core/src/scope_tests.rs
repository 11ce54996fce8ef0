// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use chrono::Utc;

fn read_op(event_id: &str) -> FileOp {
    FileOp {
        op: FileOpKind::Read,
        timestamp: Utc::now(),
        event_id: EventId::new(event_id),
        line_range: None,
    }
}

#[test]
fn record_file_op_appends_to_existing_entry() {
    let mut summary = ScopeSummary::default();
    summary.record_file_op(PathBuf::from("src/a.rs"), read_op("ev-1"));
    summary.record_file_op(PathBuf::from("src/a.rs"), read_op("ev-2"));

    assert_eq!(summary.touched_files.len(), 1);
    assert_eq!(summary.touched_files[0].ops.len(), 2);
    assert_eq!(summary.touched_files[0].ops[0].event_id, "ev-1");
    assert_eq!(summary.touched_files[0].ops[1].event_id, "ev-2");
}

#[test]
fn record_file_op_creates_entries_per_path() {
    let mut summary = ScopeSummary::default();
    summary.record_file_op(PathBuf::from("src/a.rs"), read_op("ev-1"));
    summary.record_file_op(PathBuf::from("src/b.rs"), read_op("ev-2"));

    assert_eq!(summary.touched_files.len(), 2);
}

#[test]
fn default_contract_is_single_file_read_only() {
    let contract = ScopeContract::default();
    assert_eq!(contract.max_files, 1);
    assert!(contract.allowed_tools.contains(&ToolClass::Read));
    assert!(!contract.allowed_tools.contains(&ToolClass::Write));
}

#[test]
fn in_scope_files_preserve_insertion_order() {
    let mut summary = ScopeSummary::default();
    summary.in_scope_files.insert(PathBuf::from("z.rs"));
    summary.in_scope_files.insert(PathBuf::from("a.rs"));
    let files: Vec<_> = summary.in_scope_files.iter().cloned().collect();
    assert_eq!(files, vec![PathBuf::from("z.rs"), PathBuf::from("a.rs")]);
}

#[test]
fn impact_levels_order() {
    assert!(ImpactLevel::Low < ImpactLevel::Medium);
    assert!(ImpactLevel::Medium < ImpactLevel::High);
}

#[test]
fn contract_round_trips_through_json() {
    let contract = ScopeContract {
        max_files: 4,
        max_lines: 1200,
        allowed_tools: BTreeSet::from([ToolClass::Read, ToolClass::Write]),
        budgets: Budgets::default(),
    };
    let json = serde_json::to_string(&contract).unwrap();
    let back: ScopeContract = serde_json::from_str(&json).unwrap();
    assert_eq!(back, contract);
}
