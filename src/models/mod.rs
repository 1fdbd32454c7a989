mod catalog;
mod draft;
mod quote;
mod user;

pub use catalog::{CatalogItem, Unit, CHAPTER_STEP};
pub use draft::{BudgetDraft, DraftLine, LinePatch, DEFAULT_MARKUP};
pub use quote::{display_date, HeaderInput, QuoteFooter, QuoteHeader, QuoteTitle, SavedDraft};
pub use user::{PasswordReset, Role, Subscription, User};

#[cfg(test)]
mod tests;
