//! sea-orm entities for the manufacturing schema.
//!
//! Statuses are persisted as their display strings; the `strum` enums below are
//! the typed view used by the services.

use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumIter, EnumString};

pub mod bin;
pub mod bom;
pub mod bom_item;
pub mod bom_operation;
pub mod bom_scrap_item;
pub mod item;
pub mod manufacturing_settings;
pub mod sales_order;
pub mod sales_order_item;
pub mod stock_entry;
pub mod stock_entry_detail;
pub mod stock_ledger_entry;
pub mod timesheet;
pub mod timesheet_detail;
pub mod warehouse;
pub mod work_order;
pub mod work_order_item;
pub mod work_order_operation;
pub mod workstation;

/// Document lifecycle shared by every transactional document.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, AsRefStr,
)]
pub enum DocStatus {
    Draft,
    Submitted,
    Cancelled,
}

impl DocStatus {
    pub fn code(self) -> i32 {
        match self {
            DocStatus::Draft => 0,
            DocStatus::Submitted => 1,
            DocStatus::Cancelled => 2,
        }
    }

    pub fn from_code(code: i32) -> Option<Self> {
        match code {
            0 => Some(DocStatus::Draft),
            1 => Some(DocStatus::Submitted),
            2 => Some(DocStatus::Cancelled),
            _ => None,
        }
    }
}

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
    EnumIter,
)]
pub enum WorkOrderStatus {
    Draft,
    #[strum(serialize = "Not Started")]
    #[serde(rename = "Not Started")]
    NotStarted,
    #[strum(serialize = "In Process")]
    #[serde(rename = "In Process")]
    InProcess,
    Completed,
    Stopped,
    Cancelled,
}

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
    EnumIter,
)]
pub enum OperationStatus {
    Pending,
    #[strum(serialize = "Work in Progress")]
    #[serde(rename = "Work in Progress")]
    WorkInProgress,
    Completed,
}

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
    EnumIter,
)]
pub enum StockEntryPurpose {
    #[strum(serialize = "Material Receipt")]
    #[serde(rename = "Material Receipt")]
    MaterialReceipt,
    #[strum(serialize = "Material Issue")]
    #[serde(rename = "Material Issue")]
    MaterialIssue,
    #[strum(serialize = "Material Transfer")]
    #[serde(rename = "Material Transfer")]
    MaterialTransfer,
    #[strum(serialize = "Material Transfer for Manufacture")]
    #[serde(rename = "Material Transfer for Manufacture")]
    MaterialTransferForManufacture,
    Manufacture,
}

impl StockEntryPurpose {
    /// Purposes that count toward a work order's transferred or produced quantity.
    pub fn is_work_order_purpose(self) -> bool {
        matches!(
            self,
            StockEntryPurpose::MaterialTransferForManufacture | StockEntryPurpose::Manufacture
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;
    use strum::IntoEnumIterator;

    #[test]
    fn status_strings_survive_storage_format() {
        for status in WorkOrderStatus::iter() {
            assert_eq!(WorkOrderStatus::from_str(status.as_ref()).unwrap(), status);
        }
        assert_eq!(WorkOrderStatus::NotStarted.to_string(), "Not Started");
        assert_eq!(
            StockEntryPurpose::from_str("Material Transfer for Manufacture").unwrap(),
            StockEntryPurpose::MaterialTransferForManufacture
        );
        assert_eq!(OperationStatus::WorkInProgress.as_ref(), "Work in Progress");
    }

    #[test]
    fn docstatus_codes() {
        for status in [DocStatus::Draft, DocStatus::Submitted, DocStatus::Cancelled] {
            assert_eq!(DocStatus::from_code(status.code()), Some(status));
        }
        assert_eq!(DocStatus::from_code(3), None);
    }
}
