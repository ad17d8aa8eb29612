//! Probability distributions from token occurrence records
//!
//! Three input shapes are accepted: raw occurrence rows, disassembly rows
//! (one per instruction, expanded into occurrences) and pre-computed
//! probability rows. Rows that lack a required field are handled according
//! to the configured [`MalformedPolicy`].

use indexmap::IndexMap;
use log::{debug, info, warn};
use std::collections::BTreeMap;

use crate::config::MalformedPolicy;
use crate::constants::columns;
use crate::errors::{ClusterError, ClusterResult};
use crate::models::{BlockId, BlockProfile, BlockProfiles, ProbabilityDistribution, TokenRecord, VariableType};
use crate::utils::csv::{CsvRecord, CsvTable};

/// An input row before validation
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RawRecord {
    /// Source line, for error reporting
    pub line: usize,
    /// Block id text
    pub block_id: Option<String>,
    /// Variable type text
    pub var_type: Option<String>,
    /// Token text
    pub token: Option<String>,
}

impl RawRecord {
    /// Validate the row into a typed record
    pub fn parse(&self) -> ClusterResult<TokenRecord> {
        let block_id = required(self.line, &self.block_id, columns::BLOCK_ID)?;
        let var_type = required(self.line, &self.var_type, columns::TYPE)?;
        let token = required(self.line, &self.token, columns::ASSEMBLY)?;

        let var_type: VariableType = var_type
            .parse()
            .map_err(|reason| ClusterError::MalformedRecord { line: self.line, reason })?;

        Ok(TokenRecord::new(block_id, var_type, token))
    }
}

fn required<'a>(line: usize, field: &'a Option<String>, name: &str) -> ClusterResult<&'a str> {
    match field.as_deref().map(str::trim) {
        Some(value) if !value.is_empty() => Ok(value),
        _ => Err(ClusterError::MalformedRecord {
            line,
            reason: format!("missing {}", name),
        }),
    }
}

/// Profiles built from raw rows, with the number of rows excluded as malformed
#[derive(Debug, Clone)]
pub struct BuildReport {
    /// Per-block distributions
    pub profiles: BlockProfiles,
    /// Rows accepted
    pub records: usize,
    /// Rows excluded as malformed
    pub skipped: usize,
}

/// Turns occurrence records into per-block, per-type probability distributions
#[derive(Debug, Clone, Copy, Default)]
pub struct DistributionBuilder {
    policy: MalformedPolicy,
}

impl DistributionBuilder {
    /// Create a builder with the given malformed-row policy
    pub fn new(policy: MalformedPolicy) -> Self {
        Self { policy }
    }

    /// Count every (block, type, token) triple and normalise per (block, type).
    ///
    /// Blocks keep the order in which they first appear.
    pub fn build(&self, records: &[TokenRecord]) -> BlockProfiles {
        let mut counts: IndexMap<BlockId, BTreeMap<VariableType, BTreeMap<String, usize>>> = IndexMap::new();

        for record in records {
            *counts
                .entry(record.block_id.clone())
                .or_default()
                .entry(record.var_type)
                .or_default()
                .entry(record.token.clone())
                .or_insert(0) += 1;
        }

        counts
            .into_iter()
            .map(|(block_id, by_type)| {
                let mut profile = BlockProfile::new();
                for (var_type, token_counts) in by_type {
                    profile.insert(var_type, ProbabilityDistribution::from_counts(&token_counts));
                }
                (block_id, profile)
            })
            .collect()
    }

    /// Validate raw rows, apply the malformed-row policy, then build
    pub fn build_raw(&self, rows: &[RawRecord]) -> ClusterResult<BuildReport> {
        let mut records = Vec::with_capacity(rows.len());
        let mut skipped = 0;

        for row in rows {
            if let Some(record) = apply_policy(self.policy, row.parse(), &mut skipped)? {
                records.push(record);
            }
        }

        if skipped > 0 {
            warn!("Skipped {} malformed record(s)", skipped);
        }

        let profiles = self.build(&records);
        info!("Built distributions for {} block(s) from {} record(s)", profiles.len(), records.len());

        Ok(BuildReport {
            profiles,
            records: records.len(),
            skipped,
        })
    }
}

/// Keep a value, or count/propagate its error according to the policy
pub(crate) fn apply_policy<T>(
    policy: MalformedPolicy,
    result: ClusterResult<T>,
    skipped: &mut usize,
) -> ClusterResult<Option<T>> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(e) if e.is_recoverable() && policy == MalformedPolicy::Skip => {
            debug!("{}", e);
            *skipped += 1;
            Ok(None)
        }
        Err(e) => Err(e),
    }
}

fn cell(table_row: &CsvRecord, column: Option<usize>) -> Option<String> {
    column.and_then(|c| table_row.get(c)).map(|s| s.to_string())
}

/// Read `Block_ID,Type,Assembly` occurrence rows
pub fn records_from_occurrences(table: &CsvTable) -> ClusterResult<Vec<RawRecord>> {
    let block_col = table.require_column(columns::BLOCK_ID)?;
    let type_col = table.require_column(columns::TYPE)?;
    let token_col = table.require_column(columns::ASSEMBLY)?;

    Ok(table
        .records
        .iter()
        .map(|row| RawRecord {
            line: row.line,
            block_id: cell(row, Some(block_col)),
            var_type: cell(row, Some(type_col)),
            token: cell(row, Some(token_col)),
        })
        .collect())
}

/// Expand `Block_ID,Instruction,Left Operand,Right Operand` rows into occurrence rows.
///
/// Every row yields an instruction occurrence (malformed when the mnemonic
/// is missing); operands yield occurrences only when present.
pub fn records_from_disassembly(table: &CsvTable) -> ClusterResult<Vec<RawRecord>> {
    let block_col = table.require_column(columns::BLOCK_ID)?;
    let instruction_col = table.require_column(columns::INSTRUCTION)?;
    let left_col = table.column(columns::LEFT_OPERAND);
    let right_col = table.column(columns::RIGHT_OPERAND);

    let mut records = Vec::with_capacity(table.records.len() * 3);
    for row in &table.records {
        let block_id = cell(row, Some(block_col));

        records.push(RawRecord {
            line: row.line,
            block_id: block_id.clone(),
            var_type: Some(VariableType::Instruction.label().to_string()),
            token: cell(row, Some(instruction_col)),
        });

        // a row without a block id is reported once, through its instruction record
        if block_id.as_deref().map_or(true, |id| id.trim().is_empty()) {
            continue;
        }

        for (var_type, column) in [(VariableType::LeftOperand, left_col), (VariableType::RightOperand, right_col)] {
            if let Some(operand) = cell(row, column).filter(|s| !s.trim().is_empty()) {
                records.push(RawRecord {
                    line: row.line,
                    block_id: block_id.clone(),
                    var_type: Some(var_type.label().to_string()),
                    token: Some(operand),
                });
            }
        }
    }

    Ok(records)
}

/// A pre-computed probability row
#[derive(Debug, Clone, PartialEq)]
pub struct ProbabilityRow {
    /// Typed (block, type, token)
    pub record: TokenRecord,
    /// Probability weight as given in the input
    pub probability: f64,
}

/// Read `Block_ID,Type,Assembly,Probability` rows, applying the malformed-row policy.
///
/// Returns the accepted rows and the number skipped.
pub fn probability_rows(table: &CsvTable, policy: MalformedPolicy) -> ClusterResult<(Vec<ProbabilityRow>, usize)> {
    let prob_col = table.require_column(columns::PROBABILITY)?;
    let raw = records_from_occurrences(table)?;

    let mut rows = Vec::with_capacity(raw.len());
    let mut skipped = 0;

    for (raw_row, table_row) in raw.iter().zip(&table.records) {
        let parsed = raw_row.parse().and_then(|record| {
            let text = cell(table_row, Some(prob_col)).unwrap_or_default();
            let probability: f64 = text.trim().parse().map_err(|_| ClusterError::MalformedRecord {
                line: table_row.line,
                reason: format!("unparseable {} '{}'", columns::PROBABILITY, text.trim()),
            })?;
            if !probability.is_finite() || probability < 0.0 {
                return Err(ClusterError::MalformedRecord {
                    line: table_row.line,
                    reason: format!("{} must be finite and non-negative, got {}", columns::PROBABILITY, probability),
                });
            }
            Ok(ProbabilityRow { record, probability })
        });

        if let Some(row) = apply_policy(policy, parsed, &mut skipped)? {
            rows.push(row);
        }
    }

    if skipped > 0 {
        warn!("Skipped {} malformed probability row(s)", skipped);
    }

    Ok((rows, skipped))
}

/// Normalise pre-computed probabilities within each (block, type) group.
///
/// Groups whose weights sum to zero carry no observations and are dropped.
pub fn profiles_from_probabilities(rows: &[ProbabilityRow]) -> BlockProfiles {
    let mut weights: IndexMap<BlockId, BTreeMap<VariableType, Vec<(String, f64)>>> = IndexMap::new();

    for row in rows {
        weights
            .entry(row.record.block_id.clone())
            .or_default()
            .entry(row.record.var_type)
            .or_default()
            .push((row.record.token.clone(), row.probability));
    }

    weights
        .into_iter()
        .map(|(block_id, by_type)| {
            let mut profile = BlockProfile::new();
            for (var_type, group) in by_type {
                let distribution = ProbabilityDistribution::from_weights(group);
                if distribution.is_empty() {
                    debug!("Block {} has no {} probability mass, dropping group", block_id, var_type);
                }
                profile.insert(var_type, distribution);
            }
            (block_id, profile)
        })
        .filter(|(block_id, profile)| {
            if profile.is_empty() {
                warn!("Block {} has no probability mass left, dropping it", block_id);
            }
            !profile.is_empty()
        })
        .collect()
}
