use std::sync::Arc;

/// Tags every metric recorded inside one scenario carries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetricsContext {
    scenario: Arc<str>,
}

impl MetricsContext {
    #[must_use]
    pub fn new(scenario: &str) -> Self {
        Self {
            scenario: Arc::from(scenario),
        }
    }

    #[must_use]
    pub fn scenario(&self) -> &str {
        self.scenario.as_ref()
    }

    /// `scenario`, plus `group` when set.
    #[must_use]
    pub fn base_tags<'a>(&'a self, group: Option<&'a str>) -> Vec<(&'a str, &'a str)> {
        let mut out: Vec<(&str, &str)> = Vec::with_capacity(2);
        out.push(("scenario", self.scenario()));
        if let Some(group) = group {
            out.push(("group", group));
        }
        out
    }
}
