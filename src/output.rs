//! CLI output formatting.
//!
//! # Output Format
//!
//! ## List
//!
//! ```text
//! 001 Base (base)
//!     001 Core (core)
//!         001 Loot: 70 cards, 72 copies
//!         002 Monsters: 12 cards
//! ```
//!
//! ## Generate
//!
//! Progress lines are printed as the run advances, then a summary:
//!
//! ```text
//! [  0%] generate: Reading the card list...
//! [ 98%] generate: Drawing cards on the page...
//! [100%] generate: Generated 2 page(s) for base
//!
//! Pages
//! 001 loot_1_69_10x7.png (69 cards, 10x7)
//! 002 loot_2_1_2x2.png (1 card, 2x2)
//! Backsides
//!     backside_loot_6794e7.png
//! Document
//!     base.json
//! Generated 2 pages, 1 object, 70 card entries
//! ```
//!
//! # Architecture
//!
//! Each view has a `format_*` function (returns `Vec<String>` or `String`)
//! for testability and a `print_*` wrapper that writes to stdout.

use crate::content::GameTree;
use crate::pipeline::BundleSummary;
use crate::progress::ProgressSnapshot;

/// Format a 1-based positional index as 3-digit zero-padded.
fn format_index(pos: usize) -> String {
    format!("{:0>3}", pos)
}

/// Return indentation string: 4 spaces per depth level.
fn indent(depth: usize) -> String {
    "    ".repeat(depth)
}

fn plural(n: usize, one: &str, many: &str) -> String {
    if n == 1 {
        format!("{n} {one}")
    } else {
        format!("{n} {many}")
    }
}

// ============================================================================
// List
// ============================================================================

pub fn format_content_tree(trees: &[GameTree]) -> Vec<String> {
    let mut lines = Vec::new();
    for (gi, tree) in trees.iter().enumerate() {
        lines.push(format!(
            "{} {} ({})",
            format_index(gi + 1),
            tree.game.name,
            tree.game.id
        ));
        for (ci, collection) in tree.collections.iter().enumerate() {
            lines.push(format!(
                "{}{} {} ({})",
                indent(1),
                format_index(ci + 1),
                collection.collection.name,
                collection.collection.id
            ));
            for (di, deck) in collection.decks.iter().enumerate() {
                let cards = deck.cards.len();
                let copies = deck.copies();
                let detail = if copies == cards as u64 {
                    plural(cards, "card", "cards")
                } else {
                    format!("{}, {copies} copies", plural(cards, "card", "cards"))
                };
                lines.push(format!(
                    "{}{} {}: {detail}",
                    indent(2),
                    format_index(di + 1),
                    deck.deck.name
                ));
            }
        }
    }
    if lines.is_empty() {
        lines.push("No games found".to_string());
    }
    lines
}

pub fn print_content_tree(trees: &[GameTree]) {
    for line in format_content_tree(trees) {
        println!("{}", line);
    }
}

// ============================================================================
// Generate
// ============================================================================

pub fn format_progress(snapshot: &ProgressSnapshot) -> String {
    format!(
        "[{:>3}%] {}: {}",
        snapshot.percent.round() as u32,
        snapshot.phase,
        snapshot.message
    )
}

pub fn format_bundle_summary(summary: &BundleSummary) -> Vec<String> {
    let mut lines = vec!["Pages".to_string()];
    for (i, page) in summary.pages.iter().enumerate() {
        lines.push(format!(
            "{} {} ({}, {}x{})",
            format_index(i + 1),
            page.file,
            plural(page.cards, "card", "cards"),
            page.columns,
            page.rows
        ));
    }
    lines.push("Backsides".to_string());
    for file in &summary.backsides {
        lines.push(format!("{}{}", indent(1), file));
    }
    lines.push("Document".to_string());
    lines.push(format!("{}{}", indent(1), summary.document));
    lines.push(format!(
        "Generated {}, {}, {}",
        plural(summary.pages.len(), "page", "pages"),
        plural(summary.objects, "object", "objects"),
        plural(summary.card_entries, "card entry", "card entries")
    ));
    lines
}

pub fn print_bundle_summary(summary: &BundleSummary) {
    for line in format_bundle_summary(summary) {
        println!("{}", line);
    }
}
