use std::convert::Infallible;

use crate::actor_framework::Entity;
use crate::domain::{Sale, SaleRecord};
use super::error::SalesError;

impl Entity for Sale {
    type Id = String;
    type CreateParams = SaleRecord;
    type Patch = ();
    type Action = Infallible;
    type ActionResult = ();
    type Error = SalesError;

    fn id(&self) -> &String {
        &self.id
    }

    /// The id must be the ledger key of the record's order line, which is what
    /// keeps the ledger at one entry per (order, line).
    fn from_create_params(id: String, record: SaleRecord) -> Result<Self, SalesError> {
        let expected = Sale::ledger_key(&record.order_id, record.line_index);
        if id != expected {
            return Err(SalesError::ValidationError(format!(
                "sale id {id} does not match ledger key {expected}"
            )));
        }
        if record.quantity == 0 {
            return Err(SalesError::ValidationError("sale with zero quantity".to_string()));
        }
        Ok(record.into_sale(id))
    }

    fn on_update(&mut self, _patch: ()) -> Result<(), SalesError> {
        Err(SalesError::AppendOnly)
    }

    fn on_delete(&self) -> Result<(), SalesError> {
        Err(SalesError::AppendOnly)
    }

    fn handle_action(&mut self, action: Infallible) -> Result<(), SalesError> {
        match action {}
    }
}
