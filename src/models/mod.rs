//! Records and the services that validate them before storage

pub mod gallery;
pub mod image;
pub mod oauth;
pub mod pw_reset;
pub mod services;
pub mod user;

pub use gallery::{Gallery, GalleryService};
pub use image::{Image, ImageService};
pub use oauth::{OAuth, OAuthService, OAuthToken, OAUTH_DROPBOX};
pub use pw_reset::PwReset;
pub use services::Services;
pub use user::{User, UserService};
