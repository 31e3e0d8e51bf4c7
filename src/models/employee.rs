use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;

use crate::models::user::PublicUser;

#[derive(sqlx::FromRow, Serialize, Debug, Clone)]
pub struct Employee {
    pub id: i64,
    pub employee_id: String,
    pub name: String,
    pub phone: String,
    pub date_of_birth: NaiveDate,
    pub gender: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password: String,
    pub address: String,
    pub branch_id: Option<String>,
    pub department: Option<String>,
    pub designation: Option<String>,
    pub date_of_joining: Option<NaiveDate>,
    pub account_holder_name: Option<String>,
    pub account_number: Option<String>,
    pub bank_name: Option<String>,
    pub bank_identifier_code: Option<String>,
    pub branch_location: Option<String>,
    pub tax_payer_id: Option<String>,
    pub document: Option<String>,
    pub created_by: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// An employee together with the principal who created it.
#[derive(Serialize, Debug, Clone)]
pub struct EmployeeDetail {
    #[serde(flatten)]
    pub employee: Employee,
    pub creator: Option<PublicUser>,
}

/// Everything needed to insert an employee except its allocated code.
#[derive(Debug, Clone)]
pub struct EmployeeDraft {
    pub name: String,
    pub phone: String,
    pub date_of_birth: NaiveDate,
    pub gender: String,
    pub email: String,
    pub password_hash: String,
    pub address: String,
    pub branch_id: Option<String>,
    pub department: Option<String>,
    pub designation: Option<String>,
    pub date_of_joining: Option<NaiveDate>,
    pub account_holder_name: Option<String>,
    pub account_number: Option<String>,
    pub bank_name: Option<String>,
    pub bank_identifier_code: Option<String>,
    pub branch_location: Option<String>,
    pub tax_payer_id: Option<String>,
    pub document: Option<String>,
    pub created_by: Option<i64>,
}

/// Partial update. `None` leaves a column alone; for nullable columns
/// `Some(None)` clears it.
#[derive(Debug, Clone, Default)]
pub struct EmployeeChanges {
    pub name: Option<String>,
    pub phone: Option<String>,
    pub date_of_birth: Option<NaiveDate>,
    pub gender: Option<String>,
    pub email: Option<String>,
    pub password_hash: Option<String>,
    pub address: Option<String>,
    pub branch_id: Option<Option<String>>,
    pub department: Option<Option<String>>,
    pub designation: Option<Option<String>>,
    pub date_of_joining: Option<Option<NaiveDate>>,
    pub account_holder_name: Option<Option<String>>,
    pub account_number: Option<Option<String>>,
    pub bank_name: Option<Option<String>>,
    pub bank_identifier_code: Option<Option<String>>,
    pub branch_location: Option<Option<String>>,
    pub tax_payer_id: Option<Option<String>>,
    pub document: Option<String>,
}

impl EmployeeChanges {
    pub fn apply(&self, employee: &mut Employee) {
        fn set<T: Clone>(target: &mut T, value: &Option<T>) {
            if let Some(value) = value {
                *target = value.clone();
            }
        }

        set(&mut employee.name, &self.name);
        set(&mut employee.phone, &self.phone);
        set(&mut employee.date_of_birth, &self.date_of_birth);
        set(&mut employee.gender, &self.gender);
        set(&mut employee.email, &self.email);
        set(&mut employee.password, &self.password_hash);
        set(&mut employee.address, &self.address);
        set(&mut employee.branch_id, &self.branch_id);
        set(&mut employee.department, &self.department);
        set(&mut employee.designation, &self.designation);
        set(&mut employee.date_of_joining, &self.date_of_joining);
        set(&mut employee.account_holder_name, &self.account_holder_name);
        set(&mut employee.account_number, &self.account_number);
        set(&mut employee.bank_name, &self.bank_name);
        set(&mut employee.bank_identifier_code, &self.bank_identifier_code);
        set(&mut employee.branch_location, &self.branch_location);
        set(&mut employee.tax_payer_id, &self.tax_payer_id);
        if let Some(document) = &self.document {
            employee.document = Some(document.clone());
        }
    }
}
