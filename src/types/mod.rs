mod draft;
mod models;
mod page;
mod permission;
mod redirect;

pub use draft::*;
pub use models::*;
pub use page::*;
pub use permission::*;
pub use redirect::*;
