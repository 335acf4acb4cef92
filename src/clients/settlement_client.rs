use chrono::Utc;
use rust_decimal::Decimal;
use tracing::{debug, error, info, instrument, warn};

use crate::app_system::SettlementError;
use crate::clients::{AppendOutcome, CartClient, OrderClient, PaymentCommit, ProductClient, PromoClient, SalesLedgerClient};
use crate::domain::{
    Address, Order, OrderCreate, OrderLine, OrderStatus, PaymentMethod, PricingPolicy, PromoCode, SaleRecord,
    SettlementStage,
};
use crate::notifications::{DispatcherHandle, NotificationJob};
use crate::payments::{Confirmation, GatewayError, PaymentGatewayAdapter, PaymentHandle, ProviderStatus};

const UNKNOWN_CATEGORY: &str = "uncategorized";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckoutItem {
    pub product_id: String,
    pub quantity: u32,
}

impl CheckoutItem {
    pub fn new(product_id: impl Into<String>, quantity: u32) -> Self {
        Self {
            product_id: product_id.into(),
            quantity,
        }
    }
}

/// Everything about a checkout except what is being bought.
#[derive(Debug, Clone)]
pub struct CheckoutDetails {
    pub shipping_address: Address,
    /// `None` bills to the shipping address.
    pub billing_address: Option<Address>,
    pub payment_method: PaymentMethod,
    pub promo_code: Option<String>,
}

#[derive(Debug, Clone)]
pub struct CheckoutRequest {
    /// `None` for guest checkout.
    pub customer_id: Option<String>,
    pub items: Vec<CheckoutItem>,
    pub details: CheckoutDetails,
}

/// A pending order plus what the buyer needs to complete payment.
#[derive(Debug, Clone)]
pub struct CheckoutIntent {
    pub order: Order,
    pub payment: PaymentHandle,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SettlementOutcome {
    /// This call committed the payment and applied its side effects.
    Settled(Order),
    /// The payment had already been committed; nothing was changed.
    AlreadySettled(Order),
    /// The provider has not captured the payment. Stock, sales and cart are untouched.
    PaymentIncomplete { order: Order, provider_status: ProviderStatus },
}

impl SettlementOutcome {
    pub fn order(&self) -> &Order {
        match self {
            SettlementOutcome::Settled(order)
            | SettlementOutcome::AlreadySettled(order)
            | SettlementOutcome::PaymentIncomplete { order, .. } => order,
        }
    }

    pub fn is_paid(&self) -> bool {
        !matches!(self, SettlementOutcome::PaymentIncomplete { .. })
    }
}

/// Turns priced carts into paid orders.
///
/// The only component that writes to more than one store in a single
/// operation. Before the payment commit every failure is returned; after it,
/// failures are logged as inconsistencies and settlement carries on.
#[derive(Clone)]
pub struct SettlementClient {
    orders: OrderClient,
    products: ProductClient,
    carts: CartClient,
    sales: SalesLedgerClient,
    promos: PromoClient,
    gateway: PaymentGatewayAdapter,
    notifications: DispatcherHandle,
    pricing: PricingPolicy,
}

impl SettlementClient {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        orders: OrderClient,
        products: ProductClient,
        carts: CartClient,
        sales: SalesLedgerClient,
        promos: PromoClient,
        gateway: PaymentGatewayAdapter,
        notifications: DispatcherHandle,
        pricing: PricingPolicy,
    ) -> Self {
        Self {
            orders,
            products,
            carts,
            sales,
            promos,
            gateway,
            notifications,
            pricing,
        }
    }

    /// Prices the request, creates a `pending/pending` order and opens a
    /// payment with the provider for the order's method.
    ///
    /// # Errors
    /// - `Validation` for empty items, zero quantities, unavailable products
    ///   or incomplete addresses
    /// - `StockConflict` when a product cannot cover the quantity
    /// - promo failures from [`PromoClient::compute_discount`]
    /// - `Gateway` if the provider refuses; the order is then cancelled
    #[instrument(skip(self, request), fields(customer_id = ?request.customer_id, items = request.items.len()))]
    pub async fn begin_checkout(&self, request: CheckoutRequest) -> Result<CheckoutIntent, SettlementError> {
        let CheckoutRequest { customer_id, items, details } = request;
        validate_request(customer_id.as_deref(), &items, &details)?;

        let mut lines = Vec::with_capacity(items.len());
        for item in merge_items(items) {
            let product = self
                .products
                .get_product(item.product_id.clone())
                .await?
                .ok_or_else(|| SettlementError::NotFound {
                    entity: "product",
                    id: item.product_id.clone(),
                })?;
            if !product.available {
                return Err(SettlementError::validation(format!("product {} is unavailable", product.id)));
            }
            let available = product.stock();
            if available < item.quantity {
                return Err(SettlementError::StockConflict {
                    product_id: product.id,
                    requested: item.quantity,
                    available,
                });
            }
            lines.push(OrderLine {
                product_id: product.id,
                name: product.name,
                unit_price: product.price,
                quantity: item.quantity,
                image: product.image,
            });
        }

        let subtotal: Decimal = lines.iter().map(OrderLine::total).sum();
        let (discount, promo_code) = match details.promo_code.as_deref().map(str::trim) {
            Some(code) if !code.is_empty() => {
                let quote = self
                    .promos
                    .compute_discount(code.to_string(), subtotal, customer_id.clone())
                    .await?;
                (quote.discount, Some(quote.code))
            }
            _ => (Decimal::ZERO, None),
        };
        let amounts = self.pricing.breakdown(subtotal, discount);

        let order_id = self
            .orders
            .create_order(OrderCreate {
                customer_id,
                lines,
                billing_address: details.billing_address.unwrap_or_else(|| details.shipping_address.clone()),
                shipping_address: details.shipping_address,
                amounts,
                payment_method: details.payment_method,
                promo_code,
            })
            .await?;
        let order = self.orders.require_order(order_id.clone()).await?;

        let payment = match self.gateway.open(&order).await {
            Ok(handle) => handle,
            Err(e) => {
                warn!(%order_id, error = %e, "Payment could not be opened, cancelling order");
                if let Err(cancel_err) = self.orders.cancel(order_id.clone()).await {
                    error!(%order_id, error = %cancel_err, "Failed to cancel order after gateway error");
                }
                return Err(e.into());
            }
        };
        let order = self.orders.attach_payment(order_id.clone(), payment.reference.clone()).await?;

        info!(%order_id, total = %order.amounts.total, method = %order.payment_method, "Checkout started");
        Ok(CheckoutIntent { order, payment })
    }

    /// Starts checkout for everything in the customer's cart. The cart itself
    /// is only cleared once payment settles.
    #[instrument(skip(self, details))]
    pub async fn checkout_from_cart(
        &self,
        customer_id: String,
        details: CheckoutDetails,
    ) -> Result<CheckoutIntent, SettlementError> {
        let cart = self.carts.get_cart(customer_id.clone()).await?;
        if cart.is_empty() {
            return Err(SettlementError::validation("cart is empty"));
        }
        let items = cart
            .items
            .iter()
            .map(|item| CheckoutItem::new(item.product_id.clone(), item.quantity))
            .collect();
        self.begin_checkout(CheckoutRequest {
            customer_id: Some(customer_id),
            items,
            details,
        })
        .await
    }

    /// Finalizes an order once the buyer has completed payment.
    ///
    /// Safe to call any number of times, concurrently: only the call that wins
    /// the payment commit applies stock decrements, sales, promo usage, the
    /// cart clear and the confirmation. Every other call returns the order
    /// unchanged. If a stock decrement fails the order stays in
    /// `payment_confirmed` and the confirmation waits for
    /// [`Self::reapply_side_effects`].
    ///
    /// # Errors
    /// `NotFound` for an unknown order, `Validation` for a handle that does
    /// not belong to the order or a cancelled order, and `Gateway` errors
    /// such as a rejected capture.
    #[instrument(skip(self, handle), fields(reference = %handle.reference))]
    pub async fn confirm_settlement(
        &self,
        order_id: String,
        handle: PaymentHandle,
    ) -> Result<SettlementOutcome, SettlementError> {
        let order = self.orders.require_order(order_id.clone()).await?;
        if order.is_paid() {
            info!("Duplicate confirmation, order already settled");
            return Ok(SettlementOutcome::AlreadySettled(order));
        }
        if order.status == OrderStatus::Cancelled {
            return Err(SettlementError::validation(format!("order {order_id} was cancelled")));
        }
        if order.payment_reference.as_deref() != Some(handle.reference.as_str()) {
            return Err(SettlementError::validation(format!(
                "payment {} does not belong to order {order_id}",
                handle.reference
            )));
        }
        if handle.method != order.payment_method {
            return Err(GatewayError::MethodMismatch {
                expected: order.payment_method,
                actual: handle.method,
            }
            .into());
        }

        match self.gateway.confirm(&handle).await? {
            Confirmation::Captured => {}
            Confirmation::Incomplete(provider_status) => {
                return self.record_incomplete(order_id, provider_status).await;
            }
        }

        let order = match self.orders.commit_payment(order_id.clone()).await? {
            PaymentCommit::Committed(order) => order,
            PaymentCommit::AlreadySettled(order) => {
                info!("Concurrent confirmation won the commit");
                return Ok(SettlementOutcome::AlreadySettled(order));
            }
        };
        info!(total = %order.amounts.total, "Payment committed");

        self.apply_side_effects(&order).await;

        if let Some(code) = &order.promo_code {
            if let Err(e) = self
                .promos
                .apply_usage(code.clone(), order.customer_id.clone(), order.amounts.total)
                .await
            {
                log_inconsistency(&order_id, format!("promo usage not recorded for {code}: {e}"));
            }
        }

        if let Some(customer_id) = &order.customer_id {
            if let Err(e) = self.carts.clear_cart(customer_id.clone()).await {
                log_inconsistency(&order_id, format!("cart of {customer_id} not cleared: {e}"));
            }
        }

        let order = self.refreshed(order).await;
        if order.stage == SettlementStage::InventoryApplied {
            self.schedule_confirmation(&order);
        } else {
            warn!(stage = ?order.stage, "Confirmation held until inventory is applied");
        }
        info!(stage = ?order.stage, "Order settled");
        Ok(SettlementOutcome::Settled(order))
    }

    /// Re-runs inventory and sales writes for a paid order whose settlement
    /// was interrupted. Lines already applied and sales already recorded are
    /// skipped. Cancelled orders are refused.
    #[instrument(skip(self))]
    pub async fn reapply_side_effects(&self, order_id: String) -> Result<Order, SettlementError> {
        let order = self.orders.require_order(order_id.clone()).await?;
        if order.status == OrderStatus::Cancelled {
            return Err(SettlementError::validation(format!("order {order_id} was cancelled")));
        }
        if !order.is_paid() {
            return Err(SettlementError::validation(format!("order {order_id} has no committed payment")));
        }
        let was_applied = matches!(order.stage, SettlementStage::InventoryApplied | SettlementStage::Notified);

        self.apply_side_effects(&order).await;

        let order = self.refreshed(order).await;
        if !was_applied && order.stage == SettlementStage::InventoryApplied {
            self.schedule_confirmation(&order);
        }
        info!(stage = ?order.stage, "Side effects reapplied");
        Ok(order)
    }

    /// Cancels an order that has not had inventory applied yet.
    #[instrument(skip(self))]
    pub async fn cancel_order(&self, order_id: String) -> Result<Order, SettlementError> {
        let order = self.orders.cancel(order_id).await?;
        if order.is_paid() {
            warn!(order_id = %order.order_id, "Cancelled a paid order; refund must be issued with the provider");
        } else {
            info!(order_id = %order.order_id, "Order cancelled");
        }
        Ok(order)
    }

    /// Moves a paid order along `processing -> shipped -> delivered` and
    /// notifies the customer of the change.
    #[instrument(skip(self))]
    pub async fn update_fulfillment_status(
        &self,
        order_id: String,
        status: OrderStatus,
    ) -> Result<Order, SettlementError> {
        if status == OrderStatus::Cancelled {
            return self.cancel_order(order_id).await;
        }
        let current = self.orders.require_order(order_id.clone()).await?;
        if current.status == status {
            return Ok(current);
        }
        let order = self.orders.set_fulfillment(order_id, status).await?;
        if let Err(e) = self.notifications.submit(NotificationJob::StatusUpdate {
            order: order.clone(),
            status,
        }) {
            warn!(order_id = %order.order_id, error = %e, "Status update not scheduled");
        }
        info!(order_id = %order.order_id, %status, "Fulfillment status updated");
        Ok(order)
    }

    async fn record_incomplete(
        &self,
        order_id: String,
        provider_status: ProviderStatus,
    ) -> Result<SettlementOutcome, SettlementError> {
        info!(%provider_status, "Payment not captured");
        match self
            .orders
            .record_payment_status(order_id.clone(), provider_status.as_payment_status())
            .await
        {
            Ok(order) => Ok(SettlementOutcome::PaymentIncomplete { order, provider_status }),
            Err(e) => {
                let order = self.orders.require_order(order_id).await?;
                if order.is_paid() {
                    return Ok(SettlementOutcome::AlreadySettled(order));
                }
                Err(e.into())
            }
        }
    }

    /// Per line: claim the line on the order, decrement stock for claimed
    /// lines, then record the sale. A line whose decrement fails is released
    /// and the order stays in `payment_confirmed` for a repair run. Never
    /// fails; problems are logged.
    async fn apply_side_effects(&self, order: &Order) {
        let order_id = &order.order_id;
        let sold_at = Utc::now();
        let mut complete = true;

        for (index, line) in order.lines.iter().enumerate() {
            let category = match self.orders.mark_line_applied(order_id.clone(), index).await {
                Ok(true) => match self.products.decrement_stock(line.product_id.clone(), line.quantity).await {
                    Ok(change) => {
                        debug!(product_id = %line.product_id, remaining = change.remaining, "Stock decremented");
                        Some(change.category)
                    }
                    Err(e) => {
                        log_inconsistency(
                            order_id,
                            format!("stock for {} not decremented by {}: {e}", line.product_id, line.quantity),
                        );
                        self.release_line(order_id, index).await;
                        complete = false;
                        continue;
                    }
                },
                Ok(false) => {
                    debug!(line = index, "Line already applied");
                    None
                }
                Err(e) => {
                    log_inconsistency(order_id, format!("line {index} not claimed: {e}"));
                    complete = false;
                    continue;
                }
            };

            let category = match category {
                Some(category) => category,
                None => self.category_of(&line.product_id).await,
            };
            let record = SaleRecord::from_line(order_id.clone(), index, line, category, sold_at);
            match self.sales.append(record).await {
                Ok(AppendOutcome::Recorded(_)) => {}
                Ok(AppendOutcome::Duplicate(id)) => debug!(sale_id = %id, "Sale already in ledger"),
                Err(e) => log_inconsistency(order_id, format!("sale for line {index} not recorded: {e}")),
            }
        }

        if !complete {
            warn!(%order_id, "Inventory incomplete; order stays payment_confirmed until side effects are reapplied");
            return;
        }
        if let Err(e) = self.orders.mark_inventory_applied(order_id.clone()).await {
            log_inconsistency(order_id, format!("inventory stage not reached: {e}"));
        }
    }

    async fn release_line(&self, order_id: &str, index: usize) {
        if let Err(e) = self.orders.release_line(order_id.to_string(), index).await {
            log_inconsistency(order_id, format!("line {index} left claimed without a decrement: {e}"));
        }
    }

    async fn category_of(&self, product_id: &str) -> String {
        match self.products.get_product(product_id.to_string()).await {
            Ok(Some(product)) => product.category,
            _ => UNKNOWN_CATEGORY.to_string(),
        }
    }

    fn schedule_confirmation(&self, order: &Order) {
        if let Err(e) = self.notifications.submit(NotificationJob::OrderConfirmation(order.clone())) {
            warn!(order_id = %order.order_id, error = %e, "Order confirmation not scheduled");
        }
    }

    /// Latest copy of the order, or `fallback` if the read fails.
    async fn refreshed(&self, fallback: Order) -> Order {
        match self.orders.get_order(fallback.order_id.clone()).await {
            Ok(Some(order)) => order,
            _ => fallback,
        }
    }
}

fn log_inconsistency(order_id: &str, detail: String) {
    let err = SettlementError::inconsistency(order_id, detail);
    error!(%order_id, error = %err, "Post-commit step failed");
}

fn validate_request(
    customer_id: Option<&str>,
    items: &[CheckoutItem],
    details: &CheckoutDetails,
) -> Result<(), SettlementError> {
    if customer_id.is_some_and(|id| id.trim().is_empty()) {
        return Err(SettlementError::validation("customer id is blank"));
    }
    if items.is_empty() {
        return Err(SettlementError::validation("no items to check out"));
    }
    if let Some(item) = items.iter().find(|item| item.product_id.trim().is_empty() || item.quantity == 0) {
        return Err(SettlementError::validation(format!(
            "invalid item {:?} x{}",
            item.product_id, item.quantity
        )));
    }
    if let Some(field) = details.shipping_address.missing_field() {
        return Err(SettlementError::validation(format!("shipping address is missing {field}")));
    }
    if let Some(field) = details.billing_address.as_ref().and_then(Address::missing_field) {
        return Err(SettlementError::validation(format!("billing address is missing {field}")));
    }
    if let Some(code) = &details.promo_code {
        if PromoCode::normalize(code).len() > 64 {
            return Err(SettlementError::validation("promo code too long"));
        }
    }
    Ok(())
}

/// Folds repeated products into one line, keeping first-seen order.
fn merge_items(items: Vec<CheckoutItem>) -> Vec<CheckoutItem> {
    let mut merged: Vec<CheckoutItem> = Vec::with_capacity(items.len());
    for item in items {
        match merged.iter_mut().find(|m| m.product_id == item.product_id) {
            Some(existing) => existing.quantity = existing.quantity.saturating_add(item.quantity),
            None => merged.push(item),
        }
    }
    merged
}
