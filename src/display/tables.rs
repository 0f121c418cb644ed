//! Table formatting for search results and analysis output.

use comfy_table::{
    Attribute, Cell, CellAlignment, ContentArrangement, Table, modifiers::UTF8_ROUND_CORNERS,
    presets::UTF8_FULL,
};

use crate::types::{Cluster, IndexStats, SearchResponse};
use crate::vector::DuplicatePair;

/// Longest content preview shown in a result row, in characters.
const PREVIEW_CHARS: usize = 80;

/// Builder for creating formatted tables.
pub struct TableBuilder {
    table: Table,
}

impl Default for TableBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl TableBuilder {
    pub fn new() -> Self {
        let mut table = Table::new();
        table.load_preset(UTF8_FULL);
        table.apply_modifier(UTF8_ROUND_CORNERS);
        table.set_content_arrangement(ContentArrangement::Dynamic);
        Self { table }
    }

    pub fn set_headers(mut self, headers: Vec<&str>) -> Self {
        let header_cells: Vec<Cell> = headers
            .into_iter()
            .map(|h| Cell::new(h).add_attribute(Attribute::Bold))
            .collect();
        self.table.set_header(header_cells);
        self
    }

    pub fn add_row(mut self, row: Vec<Cell>) -> Self {
        self.table.add_row(row);
        self
    }

    pub fn build(self) -> String {
        self.table.to_string()
    }
}

fn number(value: impl ToString) -> Cell {
    Cell::new(value.to_string()).set_alignment(CellAlignment::Right)
}

fn preview(content: &str) -> String {
    let flat = content.split_whitespace().collect::<Vec<_>>().join(" ");
    if flat.chars().count() <= PREVIEW_CHARS {
        flat
    } else {
        let cut: String = flat.chars().take(PREVIEW_CHARS - 1).collect();
        format!("{cut}…")
    }
}

/// Ranked results: rank, score, document id and a content preview.
pub fn search_results_table(response: &SearchResponse) -> String {
    response
        .results
        .iter()
        .enumerate()
        .fold(
            TableBuilder::new().set_headers(vec!["#", "Score", "Document", "Content"]),
            |table, (rank, result)| {
                table.add_row(vec![
                    number(rank + 1),
                    number(format!("{:.4}", result.score)),
                    Cell::new(&result.document_id),
                    Cell::new(preview(&result.content)),
                ])
            },
        )
        .build()
}

pub fn clusters_table(clusters: &[Cluster]) -> String {
    clusters
        .iter()
        .fold(
            TableBuilder::new().set_headers(vec!["Cluster", "Size", "Label", "Documents"]),
            |table, cluster| {
                let ids: Vec<&str> = cluster.document_ids.iter().map(String::as_str).collect();
                table.add_row(vec![
                    number(cluster.id),
                    number(cluster.document_ids.len()),
                    Cell::new(&cluster.label),
                    Cell::new(ids.join(", ")),
                ])
            },
        )
        .build()
}

pub fn duplicates_table(pairs: &[DuplicatePair]) -> String {
    pairs
        .iter()
        .fold(
            TableBuilder::new().set_headers(vec!["Similarity", "First", "Second"]),
            |table, pair| {
                table.add_row(vec![
                    number(format!("{:.4}", pair.similarity)),
                    Cell::new(&pair.id_a),
                    Cell::new(&pair.id_b),
                ])
            },
        )
        .build()
}

pub fn index_stats_table(stats: &IndexStats) -> String {
    TableBuilder::new()
        .set_headers(vec!["Metric", "Value"])
        .add_row(vec![Cell::new("Index"), Cell::new(&stats.name)])
        .add_row(vec![Cell::new("Documents"), number(stats.document_count)])
        .add_row(vec![Cell::new("Dimension"), number(stats.dimension)])
        .add_row(vec![Cell::new("Metric"), Cell::new(stats.metric.as_str())])
        .build()
}
