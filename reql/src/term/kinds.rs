//! Term-type integers. These match the wire protocol registry named in
//! spec §3/§8 (`MAKE_ARRAY=2`, `GT=21`, `BRACKET=170`, …).

pub const MAKE_ARRAY: i32 = 2;
pub const MAKE_OBJ: i32 = 3;
pub const VAR: i32 = 10;
pub const IMPLICIT_VAR: i32 = 13;
pub const DB: i32 = 14;
pub const TABLE: i32 = 15;
pub const GET: i32 = 16;
pub const EQ: i32 = 17;
pub const NE: i32 = 18;
pub const LT: i32 = 19;
pub const LE: i32 = 20;
pub const GT: i32 = 21;
pub const GE: i32 = 22;
pub const NOT: i32 = 23;
pub const ADD: i32 = 24;
pub const SUB: i32 = 25;
pub const MUL: i32 = 26;
pub const DIV: i32 = 27;
pub const MOD: i32 = 28;
pub const APPEND: i32 = 29;
pub const SLICE: i32 = 30;
pub const GET_FIELD: i32 = 31;
pub const HAS_FIELDS: i32 = 32;
pub const PLUCK: i32 = 33;
pub const WITHOUT: i32 = 34;
pub const MERGE: i32 = 35;
pub const REDUCE: i32 = 37;
pub const MAP: i32 = 38;
pub const FILTER: i32 = 39;
pub const CONCAT_MAP: i32 = 40;
pub const ORDER_BY: i32 = 41;
pub const DISTINCT: i32 = 42;
pub const COUNT: i32 = 43;
pub const UNION: i32 = 44;
pub const NTH: i32 = 45;
pub const IS_EMPTY: i32 = 86;
pub const UPDATE: i32 = 53;
pub const DELETE: i32 = 54;
pub const REPLACE: i32 = 55;
pub const INSERT: i32 = 56;
pub const DB_CREATE: i32 = 57;
pub const DB_DROP: i32 = 58;
pub const DB_LIST: i32 = 59;
pub const TABLE_CREATE: i32 = 60;
pub const TABLE_DROP: i32 = 61;
pub const TABLE_LIST: i32 = 62;
pub const FUNCALL: i32 = 64;
pub const BRANCH: i32 = 65;
pub const AND: i32 = 66;
pub const OR: i32 = 67;
pub const FOR_EACH: i32 = 68;
pub const FUNC: i32 = 69;
pub const SKIP: i32 = 70;
pub const LIMIT: i32 = 71;
pub const ASC: i32 = 73;
pub const DESC: i32 = 74;
pub const INDEX_CREATE: i32 = 75;
pub const INDEX_DROP: i32 = 76;
pub const INDEX_LIST: i32 = 77;
pub const GET_ALL: i32 = 78;
pub const INFO: i32 = 79;
pub const CONTAINS: i32 = 93;
pub const KEYS: i32 = 94;
pub const MATCH: i32 = 97;
pub const NOW: i32 = 103;
pub const TIME: i32 = 136;
pub const INDEX_STATUS: i32 = 139;
pub const INDEX_WAIT: i32 = 140;
pub const INDEX_RENAME: i32 = 156;
pub const UUID: i32 = 169;
pub const BRACKET: i32 = 170;
pub const LINE: i32 = 143;
pub const POLYGON: i32 = 147;
pub const RANGE: i32 = 173;
pub const CHANGES: i32 = 152;
pub const SYNC: i32 = 138;
pub const CONFIG: i32 = 174;
pub const STATUS: i32 = 175;
pub const RECONFIGURE: i32 = 176;
pub const WAIT: i32 = 177;
pub const REBALANCE: i32 = 179;
pub const GRANT: i32 = 188;

/// Feed-note markers on a `SUCCESS_PARTIAL` response (spec §4.7).
pub mod notes {
  pub const SEQUENCE_FEED: i32 = 1;
  pub const ATOM_FEED: i32 = 2;
  pub const ORDER_BY_LIMIT_FEED: i32 = 3;
  pub const UNIONED_FEED: i32 = 4;
}

/// Response `t` field values (spec §3).
pub mod response_type {
  pub const SUCCESS_ATOM: i32 = 1;
  pub const SUCCESS_SEQUENCE: i32 = 2;
  pub const SUCCESS_PARTIAL: i32 = 3;
  pub const WAIT_COMPLETE: i32 = 4;
  pub const SERVER_INFO: i32 = 5;
  pub const CLIENT_ERROR: i32 = 16;
  pub const COMPILE_ERROR: i32 = 17;
  pub const RUNTIME_ERROR: i32 = 18;
}

/// Query `type` field values (spec §6).
pub mod query_type {
  pub const START: i32 = 1;
  pub const CONTINUE: i32 = 2;
  pub const STOP: i32 = 3;
  pub const NOREPLY_WAIT: i32 = 4;
  pub const SERVER_INFO: i32 = 5;
}

/// Runtime error sub-type carried in a `RUNTIME_ERROR` response's `e` field
/// (spec §4.7).
pub mod error_type {
  pub const INTERNAL: i32 = 1_000_000;
  pub const RESOURCE_LIMIT: i32 = 2_000_000;
  pub const QUERY_LOGIC: i32 = 3_000_000;
  pub const NON_EXISTENCE: i32 = 3_100_000;
  pub const OP_FAILED: i32 = 4_100_000;
  pub const OP_INDETERMINATE: i32 = 4_200_000;
  pub const USER: i32 = 5_000_000;
  pub const PERMISSION_ERROR: i32 = 6_000_000;
}
