mod area;
mod record_kind;

pub use area::Area;
pub use record_kind::RecordKind;
