//! Domain entity definitions.

mod channel;
mod embed;
mod guild;
pub(crate) mod id;
mod member;
mod message;
mod presence;
mod read_state;
mod token;
mod user;

pub use channel::{Channel, ChannelKind};
pub use embed::{EmbedFailureStyle, EmbedKind, EmbedPlacement, MediaEmbed};
pub use guild::{Folder, Guild};
pub use id::{ChannelId, FolderId, GuildId, MessageId, RoleId, UserId};
pub use member::Member;
pub use message::{Attachment, Message};
pub use presence::{Presence, Status};
pub use read_state::ReadState;
pub use token::AuthToken;
pub use user::User;
