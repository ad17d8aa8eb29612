//! Column names of the tabular input and output contracts

pub const BLOCK_ID: &str = "Block_ID";
pub const TYPE: &str = "Type";
pub const ASSEMBLY: &str = "Assembly";
pub const PROBABILITY: &str = "Probability";
pub const ENTROPY: &str = "Entropy";

// Disassembly table
pub const INSTRUCTION: &str = "Instruction";
pub const LEFT_OPERAND: &str = "Left Operand";
pub const RIGHT_OPERAND: &str = "Right Operand";

// Pairwise tables
pub const BLOCK_ID_1: &str = "Block_ID_1";
pub const BLOCK_ID_2: &str = "Block_ID_2";
pub const DISTANCE: &str = "Distance";
pub const SIMILARITY: &str = "Similarity";

// Clustering tables
pub const CLUSTER: &str = "Cluster";
pub const SILHOUETTE: &str = "Silhouette_Coefficient";
pub const SIZE: &str = "Size";
pub const BLOCK_IDS: &str = "Block_IDs";
pub const STEP: &str = "Step";
pub const LEFT: &str = "Left";
pub const RIGHT: &str = "Right";
pub const THRESHOLD: &str = "Threshold";
pub const CLUSTERS: &str = "Clusters";
pub const MEAN_SILHOUETTE: &str = "Mean_Silhouette";
pub const DISTINCT_INSTRUCTIONS: &str = "Distinct_Instructions";
pub const DISTINCT_LEFT_OPERANDS: &str = "Distinct_Left_Operands";
pub const DISTINCT_RIGHT_OPERANDS: &str = "Distinct_Right_Operands";
