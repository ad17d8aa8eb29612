//! Core similarity and clustering engine for basic blocks
//!
//! The pipeline runs strictly forward: token records become per-block
//! distributions, distributions become a distance matrix, the matrix becomes
//! a linkage tree, the tree is cut into flat clusters and the clusters are
//! scored. [`Analyzer`] wires the stages together according to an
//! [`AnalysisConfig`]; each stage is also usable on its own.

pub mod clustering;
pub mod distance;
pub mod distribution;
pub mod divergence;
pub mod entropy;
pub mod silhouette;
pub mod summary;

use log::{info, warn};

use crate::config::{AnalysisConfig, InputKind, Metric};
use crate::errors::{ClusterError, ClusterResult};
use crate::models::{
    AnalysisReport, BlockId, BlockProfiles, ClusterAssignment, DistanceMatrix, LinkageTree, PairScores,
    SilhouetteReport, SweepPoint, TokenRecord,
};
use crate::utils::csv::CsvTable;

pub use self::clustering::{cut_tree, HierarchicalClusterer};
pub use self::distance::DistanceMatrixBuilder;
pub use self::distribution::{BuildReport, DistributionBuilder, ProbabilityRow, RawRecord};
pub use self::divergence::{jensen_shannon, overlap, DivergenceDiagnostics, DivergenceEngine};
pub use self::entropy::{entropy_rows, filter_by_entropy, shannon_entropy, token_entropy, EntropyRow};
pub use self::silhouette::silhouette;
pub use self::summary::summarize_clusters;

/// Everything produced by one run
#[derive(Debug, Clone)]
pub struct Analysis {
    /// Distributions the scores were computed from
    pub profiles: BlockProfiles,
    /// Distance (and, for overlap, similarity) matrices
    pub scores: PairScores,
    /// Entropy table of the final profiles
    pub entropy: Vec<EntropyRow>,
    /// Serializable summary
    pub report: AnalysisReport,
}

/// Main analyzer that coordinates the pipeline stages
#[derive(Debug, Clone, Default)]
pub struct Analyzer {
    config: AnalysisConfig,
}

impl Analyzer {
    /// Create a new analyzer
    pub fn new(config: AnalysisConfig) -> Self {
        Self { config }
    }

    /// Configuration in use
    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    /// Read profiles from an input table of the configured kind.
    ///
    /// Returns the profiles and the number of rows skipped as malformed.
    pub fn load_profiles(&self, table: &CsvTable) -> ClusterResult<(BlockProfiles, usize)> {
        let builder = DistributionBuilder::new(self.config.malformed);

        let (profiles, skipped) = match self.config.input_kind {
            InputKind::Occurrences => {
                let report = builder.build_raw(&distribution::records_from_occurrences(table)?)?;
                (report.profiles, report.skipped)
            }
            InputKind::Disassembly => {
                let report = builder.build_raw(&distribution::records_from_disassembly(table)?)?;
                (report.profiles, report.skipped)
            }
            InputKind::Probabilities => {
                let (rows, skipped) = distribution::probability_rows(table, self.config.malformed)?;
                (distribution::profiles_from_probabilities(&rows), skipped)
            }
        };

        Ok((self.filter(profiles), skipped))
    }

    /// Build profiles from already-typed records
    pub fn profiles_from_records(&self, records: &[TokenRecord]) -> BlockProfiles {
        let profiles = DistributionBuilder::new(self.config.malformed).build(records);
        self.filter(profiles)
    }

    fn filter(&self, profiles: BlockProfiles) -> BlockProfiles {
        if self.config.entropy_filter {
            filter_by_entropy(&profiles)
        } else {
            profiles
        }
    }

    /// Score every block pair with the configured metric
    pub fn score(&self, profiles: &BlockProfiles) -> ClusterResult<PairScores> {
        let engine = DivergenceEngine::new();
        let builder = DistanceMatrixBuilder::new(self.config.parallel);

        let scores = match self.config.metric {
            Metric::Jsd => PairScores {
                distances: builder.from_profiles(profiles, &engine)?,
                similarities: None,
                non_finite: engine.non_finite_count(),
            },
            Metric::Overlap => {
                let similarities = builder.similarity_from_profiles(profiles, &engine)?;
                PairScores {
                    distances: similarities.to_distance(),
                    similarities: Some(similarities),
                    non_finite: engine.non_finite_count(),
                }
            }
        };

        if scores.non_finite > 0 {
            warn!("{} divergence(s) were non-finite and clamped to 0", scores.non_finite);
        }
        Ok(scores)
    }

    /// Build the linkage tree and, with a threshold configured, the flat clusters
    pub fn cluster(&self, distances: &DistanceMatrix) -> ClusterResult<(LinkageTree, Option<ClusterAssignment>)> {
        HierarchicalClusterer::new(self.config.linkage).fit_cut(distances, self.config.threshold)
    }

    /// Silhouette of an assignment; an undefined silhouette is returned as a note instead of an error
    pub fn evaluate(
        &self,
        distances: &DistanceMatrix,
        assignment: &ClusterAssignment,
    ) -> ClusterResult<(Option<SilhouetteReport>, Option<String>)> {
        match silhouette(distances, assignment) {
            Ok(report) => Ok((Some(report), None)),
            Err(ClusterError::UndefinedSilhouette(reason)) => {
                warn!("Silhouette undefined: {}", reason);
                Ok((None, Some(reason)))
            }
            Err(e) => Err(e),
        }
    }

    /// Cluster count and mean silhouette at every configured sweep threshold
    pub fn sweep(&self, distances: &DistanceMatrix, tree: &LinkageTree) -> ClusterResult<Vec<SweepPoint>> {
        let mut points = Vec::with_capacity(self.config.sweep.len());

        for &threshold in &self.config.sweep {
            let assignment = cut_tree(tree, distances.block_ids(), threshold)?;
            let mean_silhouette = match silhouette(distances, &assignment) {
                Ok(report) => Some(report.mean),
                Err(ClusterError::UndefinedSilhouette(_)) => None,
                Err(e) => return Err(e),
            };
            points.push(SweepPoint {
                threshold,
                clusters: assignment.cluster_count(),
                mean_silhouette,
            });
        }

        Ok(points)
    }

    /// Run scoring, clustering and evaluation over prepared profiles.
    ///
    /// `cached` scores are used when they cover exactly the profiled
    /// blocks in the same order; otherwise they are recomputed.
    pub fn run(&self, profiles: BlockProfiles, skipped: usize, cached: Option<PairScores>) -> ClusterResult<Analysis> {
        let block_ids: Vec<BlockId> = profiles.keys().cloned().collect();

        let (scores, from_cache) = match cached {
            Some(scores) if scores.distances.block_ids() == block_ids.as_slice() => {
                info!("Using cached distance matrix for {} block(s)", block_ids.len());
                (scores, true)
            }
            Some(_) => {
                warn!("Cached distance matrix does not match the input blocks, recomputing");
                (self.score(&profiles)?, false)
            }
            None => (self.score(&profiles)?, false),
        };

        let (linkage, assignment) = self.cluster(&scores.distances)?;

        let (silhouette, silhouette_note, clusters) = match &assignment {
            Some(assignment) => {
                info!("Cut produced {} cluster(s)", assignment.cluster_count());
                let (report, note) = self.evaluate(&scores.distances, assignment)?;
                (report, note, summarize_clusters(assignment, &profiles))
            }
            None => (None, None, Vec::new()),
        };

        let sweep = self.sweep(&scores.distances, &linkage)?;
        let entropy = entropy_rows(&profiles);

        let report = AnalysisReport {
            version: crate::VERSION.to_string(),
            input: None,
            config: self.config.clone(),
            blocks: block_ids,
            skipped_records: skipped,
            non_finite_clamps: scores.non_finite,
            from_cache,
            linkage,
            assignment,
            silhouette,
            silhouette_note,
            clusters,
            sweep,
        };

        Ok(Analysis {
            profiles,
            scores,
            entropy,
            report,
        })
    }
}
