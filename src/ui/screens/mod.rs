pub(crate) mod drafts;
pub(crate) mod edit;
pub(crate) mod review;
pub(crate) mod select;
