//! Domain types and models

pub mod accurate;

pub use accurate::{
    Customer, Envelope, Item, ItemImage, ItemImages, NewCustomer, Page, Pagination, SalesOrder,
    SalesOrderDraft, SalesOrderLine, SalesOrderQuery, SavedCustomer, SavedSalesOrder,
    TokenPayload, TokenVerificationResponse,
};
