mod codec;
mod row;
mod service;

pub use codec::{
    decode_assignment, decode_member, decode_permissions, decode_role, decode_rule, decode_tag,
    decode_tag_list, decode_user, encode_assignment, encode_permissions, encode_role, encode_rule,
    encode_tag, encode_tag_list, member_tags_patch,
};
pub use row::Row;
pub use service::{Table, TableService};
