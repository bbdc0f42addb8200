//! Aggregates module
pub mod product;
pub mod quote;
pub mod order;
pub mod cart;

pub use product::{Product, ProductError, Variant};
pub use quote::{PriceEdit, Quote, QuoteCustomer, QuoteError, QuoteItem, QuoteItemRequest, QuoteStatus, QuoteSubmission, QuoteTotals};
pub use order::{Order, OrderError, LineItem};
pub use cart::{Cart, CartError, CartItem};
