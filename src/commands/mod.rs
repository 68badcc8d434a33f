pub mod bam_to_bw;
pub mod predict;
