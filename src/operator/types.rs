use serde::{Deserialize, Serialize};

/// Whether an operator account is enabled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OperatorStatus {
    #[serde(rename = "ON")]
    On,
    #[serde(rename = "OFF")]
    Off,
}

impl OperatorStatus {
    pub fn toggled(self) -> Self {
        match self {
            Self::On => Self::Off,
            Self::Off => Self::On,
        }
    }
}

/// An operator as returned by list and detail.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OperatorInfo {
    pub user_id: String,
    pub operator_name: String,
    pub operator_code: String,
    #[serde(default)]
    pub alias_name: String,
    #[serde(default)]
    pub mobile: String,
    #[serde(default)]
    pub email: String,
    pub status: OperatorStatus,
    #[serde(default)]
    pub domain_num: u32,
    #[serde(default)]
    pub created_time: String,
    #[serde(default)]
    pub remark: String,
}

/// Paging and filters for list and export.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OperatorQuery {
    pub page_index: u32,
    pub page_size: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub operator_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub operator_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<OperatorStatus>,
}

impl Default for OperatorQuery {
    fn default() -> Self {
        Self {
            page_index: 1,
            page_size: 10,
            operator_name: None,
            operator_code: None,
            status: None,
        }
    }
}

impl OperatorQuery {
    pub fn page(page_index: u32, page_size: u32) -> Self {
        Self {
            page_index,
            page_size,
            ..Self::default()
        }
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.operator_name = Some(name.into());
        self
    }

    pub fn code(mut self, code: impl Into<String>) -> Self {
        self.operator_code = Some(code.into());
        self
    }

    pub fn status(mut self, status: OperatorStatus) -> Self {
        self.status = Some(status);
        self
    }
}

/// Fields accepted by add and update.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OperatorForm {
    pub operator_name: String,
    pub operator_code: String,
    pub alias_name: String,
    pub mobile: String,
    pub email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remark: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct OperatorUpdate<'a> {
    #[serde(flatten)]
    pub form: &'a OperatorForm,
    pub user_id: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct UserIdParam<'a> {
    pub user_id: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct StatusChange<'a> {
    pub operator_code: &'a str,
    pub control: OperatorStatus,
}

/// One page of operators.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OperatorPage {
    #[serde(default)]
    pub total: u64,
    #[serde(default)]
    pub list: Vec<OperatorInfo>,
}

/// `{ code, data, message }` wrapper around every JSON response.
#[derive(Debug, Deserialize)]
pub(super) struct ApiEnvelope {
    pub code: i64,
    #[serde(default)]
    pub data: serde_json::Value,
    #[serde(default, alias = "msg")]
    pub message: String,
}
