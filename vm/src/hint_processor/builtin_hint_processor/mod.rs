pub mod blake2s_hash;
pub mod blake2s_utils;
pub mod builtin_hint_processor_definition;
pub mod dict_hint_utils;
pub mod dict_manager;
pub mod hint_code;
pub mod hint_utils;
pub mod math_utils;
pub mod memcpy_hint_utils;
pub mod memset_utils;
pub mod pow_utils;
pub mod print;
pub mod segments;
pub mod signature;
pub mod squash_dict_utils;
pub mod uint256_utils;
