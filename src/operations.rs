use crate::model::ResourceKind;

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub struct OperationSpec {
    pub key: &'static str,
    pub label: &'static str,
    /// Prompt for a free-text argument passed as `extra`.
    pub prompt: Option<&'static str>,
    /// Statuses the operation applies to; empty means any.
    pub statuses: &'static [&'static str],
    pub destructive: bool,
}

impl OperationSpec {
    pub fn applies_to(&self, status: Option<&str>) -> bool {
        self.statuses.is_empty() || status.is_some_and(|status| self.statuses.contains(&status))
    }
}

const DELETE: OperationSpec = OperationSpec {
    key: "delete",
    label: "Delete",
    prompt: None,
    statuses: &[],
    destructive: true,
};

const DEVBOX_OPERATIONS: &[OperationSpec] = &[
    OperationSpec {
        key: "exec",
        label: "Execute command",
        prompt: Some("command"),
        statuses: &["running"],
        destructive: false,
    },
    OperationSpec {
        key: "snapshot",
        label: "Snapshot disk",
        prompt: None,
        statuses: &["running", "suspended"],
        destructive: false,
    },
    OperationSpec {
        key: "suspend",
        label: "Suspend",
        prompt: None,
        statuses: &["running"],
        destructive: false,
    },
    OperationSpec {
        key: "resume",
        label: "Resume",
        prompt: None,
        statuses: &["suspended"],
        destructive: false,
    },
    OperationSpec {
        key: "shutdown",
        label: "Shutdown",
        prompt: None,
        statuses: &[
            "provisioning",
            "initializing",
            "running",
            "suspending",
            "suspended",
            "resuming",
        ],
        destructive: true,
    },
];

const DELETE_ONLY: &[OperationSpec] = &[DELETE];

pub fn operations_for(kind: ResourceKind) -> &'static [OperationSpec] {
    match kind {
        ResourceKind::Devboxes => DEVBOX_OPERATIONS,
        _ => DELETE_ONLY,
    }
}

pub fn available_operations(kind: ResourceKind, status: Option<&str>) -> Vec<OperationSpec> {
    operations_for(kind)
        .iter()
        .filter(|spec| spec.applies_to(status))
        .copied()
        .collect()
}

pub fn find_operation(kind: ResourceKind, key: &str) -> Option<OperationSpec> {
    operations_for(kind)
        .iter()
        .find(|spec| spec.key == key)
        .copied()
}

/// Tracks one operation run against one item. The item and key are handed to
/// the request directly; the fields set by `begin` are for display only.
#[derive(Debug, Clone)]
pub struct ListOperations<T> {
    selected_item: Option<T>,
    executing_operation: Option<String>,
    is_loading: bool,
    result: Option<String>,
    error: Option<String>,
}

impl<T> Default for ListOperations<T> {
    fn default() -> Self {
        Self {
            selected_item: None,
            executing_operation: None,
            is_loading: false,
            result: None,
            error: None,
        }
    }
}

impl<T: Clone> ListOperations<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn selected_item(&self) -> Option<&T> {
        self.selected_item.as_ref()
    }

    pub fn executing_operation(&self) -> Option<&str> {
        self.executing_operation.as_deref()
    }

    pub fn is_loading(&self) -> bool {
        self.is_loading
    }

    pub fn result(&self) -> Option<&str> {
        self.result.as_deref()
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn begin(&mut self, item: T, operation: &str) {
        self.selected_item = Some(item);
        self.executing_operation = Some(operation.to_string());
        self.is_loading = true;
        self.result = None;
        self.error = None;
    }

    pub fn finish(&mut self, outcome: Result<String, String>) {
        match outcome {
            Ok(message) => self.result = Some(message),
            Err(error) => self.error = Some(error),
        }
        self.is_loading = false;
    }

    pub fn clear_result(&mut self) {
        *self = Self::default();
    }
}
