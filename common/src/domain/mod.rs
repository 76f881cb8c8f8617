pub mod kind;
pub mod normalize;
pub mod record;
pub mod residence;
pub mod status;

pub use kind::PublicationKind;
pub use normalize::{DisplayRecord, normalize, normalize_list, residence_ids_of};
pub use record::RawRecord;
pub use residence::{Residence, ResidenceId};
pub use status::{SemanticColor, Status};
