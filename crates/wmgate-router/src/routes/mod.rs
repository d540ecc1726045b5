pub(crate) mod google;
pub(crate) mod meta;
pub(crate) mod openai;
pub(crate) mod web;
