/// Visual element shown during the response window.
///
/// The scheduler never looks inside a stimulus; it only hands the trial's
/// elements to the display and logs their label.
pub trait Stimulus: Clone + Send + Sync + std::fmt::Debug {
    fn label(&self) -> &str;
}
