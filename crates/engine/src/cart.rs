//! Line items of the order draft.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tablecrm_pos_core::{Product, ProductId};

/// One product in the cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderItem {
    /// Product snapshot taken when it was first added.
    pub product: Product,
    /// Always at least 1.
    pub quantity: u32,
}

impl OrderItem {
    /// `quantity × price`, with a missing price counting as zero.
    ///
    /// Saturates at `Decimal::MAX`; see [`OrderItem::checked_line_total`].
    #[must_use]
    pub fn line_total(&self) -> Decimal {
        self.product
            .price_or_zero()
            .saturating_mul(Decimal::from(self.quantity))
    }

    /// `quantity × price`, `None` when it does not fit a `Decimal`.
    #[must_use]
    pub fn checked_line_total(&self) -> Option<Decimal> {
        self.product
            .price_or_zero()
            .checked_mul(Decimal::from(self.quantity))
    }
}

/// Ordered collection of line items, at most one per product.
///
/// Stock is advisory: no operation refuses a quantity above it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cart {
    items: Vec<OrderItem>,
}

impl Cart {
    #[must_use]
    pub const fn new() -> Self {
        Self { items: Vec::new() }
    }

    /// Lines in insertion order.
    #[must_use]
    pub fn items(&self) -> &[OrderItem] {
        &self.items
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Number of distinct products.
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Sum of all quantities.
    #[must_use]
    pub fn item_count(&self) -> u64 {
        self.items.iter().map(|item| u64::from(item.quantity)).sum()
    }

    #[must_use]
    pub fn quantity_of(&self, id: ProductId) -> u32 {
        self.line(id).map_or(0, |item| item.quantity)
    }

    /// Add one unit of `product`, appending a new line if it is not present.
    pub fn add(&mut self, product: &Product) {
        match self.items.iter_mut().find(|item| item.product.id == product.id) {
            Some(item) => item.quantity = item.quantity.saturating_add(1),
            None => self.items.push(OrderItem {
                product: product.clone(),
                quantity: 1,
            }),
        }
    }

    /// Set the quantity of a present line. Zero or less removes it.
    ///
    /// Returns `false` when the product is not in the cart.
    pub fn set_quantity(&mut self, id: ProductId, quantity: i64) -> bool {
        if self.line(id).is_none() {
            return false;
        }
        if quantity <= 0 {
            self.remove(id);
        } else if let Some(item) = self.items.iter_mut().find(|item| item.product.id == id) {
            item.quantity = u32::try_from(quantity).unwrap_or(u32::MAX);
        }
        true
    }

    /// Change the quantity of a present line by `delta`.
    pub fn step_quantity(&mut self, id: ProductId, delta: i64) -> bool {
        let current = i64::from(self.quantity_of(id));
        self.set_quantity(id, current.saturating_add(delta))
    }

    /// Drop a line. No-op when absent.
    pub fn remove(&mut self, id: ProductId) {
        self.items.retain(|item| item.product.id != id);
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }

    /// Order total for display, saturating at `Decimal::MAX`.
    #[must_use]
    pub fn total(&self) -> Decimal {
        self.items
            .iter()
            .map(OrderItem::line_total)
            .fold(Decimal::ZERO, Decimal::saturating_add)
    }

    /// Exact order total, `None` when it does not fit a `Decimal`.
    #[must_use]
    pub fn checked_total(&self) -> Option<Decimal> {
        self.items
            .iter()
            .try_fold(Decimal::ZERO, |total, item| total.checked_add(item.checked_line_total()?))
    }

    /// Whether adding one more unit stays within the product's known stock.
    ///
    /// Advisory only; [`Cart::add`] does not consult it.
    #[must_use]
    pub fn can_increment(&self, product: &Product) -> bool {
        product
            .stock
            .is_none_or(|stock| Decimal::from(self.quantity_of(product.id)) < stock)
    }

    /// The line for `id`, if present.
    #[must_use]
    pub fn line(&self, id: ProductId) -> Option<&OrderItem> {
        self.items.iter().find(|item| item.product.id == id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn product(id: i64, price: Option<i64>) -> Product {
        Product::new(ProductId::new(id), format!("Product {id}"), price.map(Decimal::from))
    }

    #[test]
    fn test_add_twice_increments() {
        let mut cart = Cart::new();
        let coffee = product(7, Some(150));
        cart.add(&coffee);
        cart.add(&coffee);

        assert_eq!(cart.len(), 1);
        assert_eq!(cart.quantity_of(coffee.id), 2);
        assert_eq!(cart.total(), Decimal::from(300));
    }

    #[test]
    fn test_insertion_order_is_kept() {
        let mut cart = Cart::new();
        cart.add(&product(3, Some(1)));
        cart.add(&product(1, Some(1)));
        cart.add(&product(3, Some(1)));

        let ids: Vec<_> = cart.items().iter().map(|i| i.product.id.as_i64()).collect();
        assert_eq!(ids, vec![3, 1]);
    }

    #[test]
    fn test_set_quantity_zero_or_negative_removes() {
        let mut cart = Cart::new();
        cart.add(&product(1, Some(10)));
        cart.add(&product(2, Some(10)));

        assert!(cart.set_quantity(ProductId::new(1), 0));
        assert!(cart.set_quantity(ProductId::new(2), -3));
        assert!(cart.is_empty());
        assert!(!cart.set_quantity(ProductId::new(9), 4));
    }

    #[test]
    fn test_set_quantity_ignores_stock() {
        let mut cart = Cart::new();
        let mut scarce = product(1, Some(10));
        scarce.stock = Some(Decimal::from(2));
        cart.add(&scarce);

        assert!(cart.set_quantity(scarce.id, 50));
        assert_eq!(cart.quantity_of(scarce.id), 50);
        assert!(!cart.can_increment(&scarce));
    }

    #[test]
    fn test_can_increment_without_stock_info() {
        let cart = Cart::new();
        assert!(cart.can_increment(&product(1, Some(10))));
    }

    #[test]
    fn test_step_quantity() {
        let mut cart = Cart::new();
        let tea = product(4, Some(90));
        cart.add(&tea);

        assert!(cart.step_quantity(tea.id, 1));
        assert_eq!(cart.quantity_of(tea.id), 2);
        assert!(cart.step_quantity(tea.id, -2));
        assert!(cart.is_empty());
        assert!(!cart.step_quantity(tea.id, 1));
    }

    #[test]
    fn test_missing_price_counts_as_zero() {
        let mut cart = Cart::new();
        cart.add(&product(1, None));
        cart.add(&product(2, Some(25)));
        cart.set_quantity(ProductId::new(1), 4);

        assert_eq!(cart.items()[0].line_total(), Decimal::ZERO);
        assert_eq!(cart.total(), Decimal::from(25));
        assert_eq!(cart.item_count(), 5);
    }

    #[test]
    fn test_oversized_total_saturates() {
        let mut cart = Cart::new();
        let gold = Product::new(
            ProductId::new(1),
            "Gold",
            Some(Decimal::from_i128_with_scale(100_000_000_000_000_000_000, 0)),
        );
        cart.add(&gold);
        cart.set_quantity(gold.id, 1_000_000_000);

        assert_eq!(cart.total(), Decimal::MAX);
        assert_eq!(cart.checked_total(), None);
        assert_eq!(cart.items()[0].checked_line_total(), None);
    }

    #[test]
    fn test_checked_total_matches_total() {
        let mut cart = Cart::new();
        cart.add(&product(1, Some(150)));
        cart.add(&product(1, Some(150)));
        cart.add(&product(2, None));

        assert_eq!(cart.checked_total(), Some(Decimal::from(300)));
        assert_eq!(cart.checked_total(), Some(cart.total()));
    }

    #[test]
    fn test_remove_absent_is_noop() {
        let mut cart = Cart::new();
        cart.add(&product(1, Some(5)));
        cart.remove(ProductId::new(2));
        assert_eq!(cart.len(), 1);
        cart.remove(ProductId::new(1));
        assert!(cart.is_empty());
    }
}
