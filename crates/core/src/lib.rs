pub mod cart;
pub mod catalog;
pub mod config;
pub mod domain;
pub mod errors;
pub mod notifier;
pub mod query;
pub mod storage;

pub use cart::CartService;
pub use catalog::{CatalogService, CatalogSettings};
pub use domain::cart::{Cart, CartId, CartItem, CartLineView, CartView};
pub use domain::product::{
    NewProduct, Product, ProductId, ProductInput, ProductPatch, ProductStatus,
};
pub use errors::{ApplicationError, DomainError, InterfaceError};
pub use notifier::{Notifier, NotifierEvent, SubscriberId, Subscription};
pub use query::{PageQuery, ProductPage};
pub use storage::{ProductFilter, ProductQuery, SortOrder, StorageAdapter, StorageError};
