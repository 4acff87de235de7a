/// Position of a job within the batch it was submitted with.
///
/// Assigned once at run start and used as the only job identifier in
/// progress events, so it stays valid even if the input list changes.
pub type JobIndex = u32;
