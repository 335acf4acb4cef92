use std::collections::BTreeMap;

use rust_decimal::Decimal;
use tracing::{debug, info, instrument};

use crate::actor_framework::ResourceClient;
use crate::domain::{MonthlySales, Sale, SaleRecord};
use crate::sales_actor::SalesError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppendOutcome {
    Recorded(String),
    /// The (order, line) pair already has a sale; nothing was written.
    Duplicate(String),
}

/// Client for the append-only sales ledger.
#[derive(Clone)]
pub struct SalesLedgerClient {
    inner: ResourceClient<Sale>,
}

impl_basic_client!(SalesLedgerClient, Sale, SalesError, sale);

impl SalesLedgerClient {
    /// Records one sale under its `(order, line)` key.
    #[instrument(skip(self, record), fields(order_id = %record.order_id, line = record.line_index))]
    pub async fn append(&self, record: SaleRecord) -> Result<AppendOutcome, SalesError> {
        debug!("Sending request");
        let key = Sale::ledger_key(&record.order_id, record.line_index);
        match self.inner.insert(key.clone(), record).await {
            Ok(id) => {
                info!(sale_id = %id, "Sale recorded");
                Ok(AppendOutcome::Recorded(id))
            }
            Err(SalesError::AlreadyRecorded(_)) => {
                debug!(sale_id = %key, "Sale already recorded");
                Ok(AppendOutcome::Duplicate(key))
            }
            Err(e) => Err(e),
        }
    }

    /// Sales of one order, by line.
    #[instrument(skip(self))]
    pub async fn sales_for_order(&self, order_id: String) -> Result<Vec<Sale>, SalesError> {
        let mut sales: Vec<Sale> = self
            .inner
            .list()
            .await?
            .into_iter()
            .filter(|sale| sale.order_id == order_id)
            .collect();
        sales.sort_by_key(|sale| sale.line_index);
        Ok(sales)
    }

    /// Units and revenue per calendar month, oldest first.
    #[instrument(skip(self))]
    pub async fn monthly_totals(&self) -> Result<Vec<MonthlySales>, SalesError> {
        let mut months: BTreeMap<(i32, u32), (u64, Decimal)> = BTreeMap::new();
        for sale in self.inner.list().await? {
            let entry = months.entry((sale.year, sale.month)).or_default();
            entry.0 += u64::from(sale.quantity);
            entry.1 += sale.total;
        }
        Ok(months
            .into_iter()
            .map(|((year, month), (units, revenue))| MonthlySales {
                year,
                month,
                units,
                revenue,
            })
            .collect())
    }
}
