/// The modal "working" indicator shown while a blocking refactoring runs.
///
/// All methods are called on the owning thread.
pub trait BusyIndicator {
    fn begin(&mut self, title: &str);

    /// Called every time the blocking wait wakes up without a result.
    fn tick(&mut self) {}

    fn end(&mut self);
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NoopBusyIndicator;

impl BusyIndicator for NoopBusyIndicator {
    fn begin(&mut self, _title: &str) {}

    fn end(&mut self) {}
}
