use indoc::indoc;

// Segments and scopes

pub const ADD_SEGMENT: &str = indoc! {r#"memory[ap] = segments.add()"#};

pub const TEMPORARY_ARRAY: &str = indoc! {r#"ids.temporary_array = segments.add_temp_segment()"#};

pub const RELOCATE_SEGMENT: &str = indoc! {r#"memory.add_relocation_rule(src_ptr=ids.src_ptr, dest_ptr=ids.dest_ptr)"#};

pub const VM_ENTER_SCOPE: &str = indoc! {r#"vm_enter_scope()"#};

pub const VM_EXIT_SCOPE: &str = indoc! {r#"vm_exit_scope()"#};

pub const MEMCPY_ENTER_SCOPE: &str = indoc! {r#"vm_enter_scope({'n': ids.len})"#};

pub const MEMCPY_CONTINUE_COPYING: &str = indoc! {r#"n -= 1
ids.continue_copying = 1 if n > 0 else 0"#};

pub const MEMSET_ENTER_SCOPE: &str = indoc! {r#"vm_enter_scope({'n': ids.n})"#};

pub const MEMSET_CONTINUE_LOOP: &str = indoc! {r#"n -= 1
ids.continue_loop = 1 if n > 0 else 0"#};

// Math

pub const ASSERT_NN: &str = indoc! {r#"from starkware.cairo.common.math_utils import assert_integer
assert_integer(ids.a)
assert 0 <= ids.a % PRIME < range_check_builtin.bound, f'a = {ids.a} is out of range.'"#};

pub const ASSERT_NOT_ZERO: &str = indoc! {r#"from starkware.cairo.common.math_utils import assert_integer
assert_integer(ids.value)
assert ids.value % PRIME != 0, f'assert_not_zero failed: {ids.value} = 0.'"#};

pub const ASSERT_NOT_EQUAL: &str = indoc! {r#"from starkware.cairo.lang.vm.relocatable import RelocatableValue
both_ints = isinstance(ids.a, int) and isinstance(ids.b, int)
both_relocatable = (
    isinstance(ids.a, RelocatableValue) and isinstance(ids.b, RelocatableValue) and
    ids.a.segment_index == ids.b.segment_index)
assert both_ints or both_relocatable, \
    f'assert_not_equal failed: non-comparable values: {ids.a}, {ids.b}.'
assert (ids.a - ids.b) % PRIME != 0, f'assert_not_equal failed: {ids.a} = {ids.b}.'"#};

pub const IS_NN: &str = indoc! {r#"memory[ap] = 0 if 0 <= (ids.a % PRIME) < range_check_builtin.bound else 1"#};

pub const IS_NN_OUT_OF_RANGE: &str = indoc! {r#"memory[ap] = 0 if 0 <= ((-ids.a - 1) % PRIME) < range_check_builtin.bound else 1"#};

pub const IS_LE_FELT: &str = indoc! {r#"memory[ap] = 0 if (ids.a % PRIME) <= (ids.b % PRIME) else 1"#};

pub const IS_POSITIVE: &str = indoc! {r#"from starkware.cairo.common.math_utils import is_positive
ids.is_positive = 1 if is_positive(
    value=ids.value, prime=PRIME, rc_bound=range_check_builtin.bound) else 0"#};

pub const ASSERT_LT_FELT: &str = indoc! {r#"from starkware.cairo.common.math_utils import assert_integer
assert_integer(ids.a)
assert_integer(ids.b)
assert (ids.a % PRIME) < (ids.b % PRIME), \
    f'a = {ids.a % PRIME} is not less than b = {ids.b % PRIME}.'"#};

pub const ASSERT_250_BITS: &str = indoc! {r#"from starkware.cairo.common.math_utils import as_int

# Correctness check.
value = as_int(ids.value, PRIME) % PRIME
assert value < ids.UPPER_BOUND, f'{value} is outside of the range [0, 2**250).'

# Calculation for the assertion.
ids.high, ids.low = divmod(ids.value, ids.SHIFT)"#};

pub const IS_250_BITS: &str = indoc! {r#"ids.is_250 = 1 if ids.addr < 2**250 else 0"#};

pub const SPLIT_FELT: &str = indoc! {r#"from starkware.cairo.common.math_utils import assert_integer
assert ids.MAX_HIGH < 2**128 and ids.MAX_LOW < 2**128
assert PRIME - 1 == ids.MAX_HIGH * 2**128 + ids.MAX_LOW
assert_integer(ids.value)
ids.low = ids.value & ((1 << 128) - 1)
ids.high = ids.value >> 128"#};

pub const SPLIT_INT: &str = indoc! {r#"memory[ids.output] = res = (int(ids.value) % PRIME) % ids.base
assert res < ids.bound, f'split_int(): Limb {res} is out of range.'"#};

pub const SPLIT_INT_ASSERT_RANGE: &str = indoc! {r#"assert ids.value == 0, 'split_int(): value is out of range.'"#};

pub const SQRT: &str = indoc! {r#"from starkware.python.math_utils import isqrt
value = ids.value % PRIME
assert value < 2 ** 250, f"value={value} is outside of the range [0, 2**250)."
assert 2 ** 250 < PRIME
ids.root = isqrt(value)"#};

pub const UNSIGNED_DIV_REM: &str = indoc! {r#"from starkware.cairo.common.math_utils import assert_integer
assert_integer(ids.div)
assert 0 < ids.div <= PRIME // range_check_builtin.bound, \
    f'div={hex(ids.div)} is out of the valid range.'
ids.q, ids.r = divmod(ids.value, ids.div)"#};

pub const SIGNED_DIV_REM: &str = indoc! {r#"from starkware.cairo.common.math_utils import as_int, assert_integer

assert_integer(ids.div)
assert 0 < ids.div <= PRIME // range_check_builtin.bound, \
    f'div={hex(ids.div)} is out of the valid range.'

assert_integer(ids.bound)
assert ids.bound <= range_check_builtin.bound // 2, \
    f'bound={hex(ids.bound)} is out of the valid range.'

int_value = as_int(ids.value, PRIME)
q, ids.r = divmod(int_value, ids.div)

assert -ids.bound <= q < ids.bound, \
    f'{int_value} / {ids.div} = {q} is out of the range [{-ids.bound}, {ids.bound}).'

ids.biased_q = q + ids.bound"#};

pub const POW: &str = indoc! {r#"ids.locs.bit = (ids.prev_locs.exp % PRIME) & 1"#};

pub const GET_FELT_BIT_LENGTH: &str = indoc! {r#"x = ids.x
ids.bit_length = x.bit_length()"#};

// Dictionaries

pub const DICT_NEW: &str = indoc! {r#"if '__dict_manager' not in globals():
    from starkware.cairo.common.dict import DictManager
    __dict_manager = DictManager()

memory[ap] = __dict_manager.new_dict(segments, initial_dict)
del initial_dict"#};

pub const DEFAULT_DICT_NEW: &str = indoc! {r#"if '__dict_manager' not in globals():
    from starkware.cairo.common.dict import DictManager
    __dict_manager = DictManager()

memory[ap] = __dict_manager.new_default_dict(segments, ids.default_value)"#};

pub const DICT_READ: &str = indoc! {r#"dict_tracker = __dict_manager.get_tracker(ids.dict_ptr)
dict_tracker.current_ptr += ids.DictAccess.SIZE
ids.value = dict_tracker.data[ids.key]"#};

pub const DICT_WRITE: &str = indoc! {r#"dict_tracker = __dict_manager.get_tracker(ids.dict_ptr)
dict_tracker.current_ptr += ids.DictAccess.SIZE
ids.dict_ptr.prev_value = dict_tracker.data[ids.key]
dict_tracker.data[ids.key] = ids.new_value"#};

pub const DICT_UPDATE: &str = indoc! {r#"# Verify dict pointer and prev value.
dict_tracker = __dict_manager.get_tracker(ids.dict_ptr)
current_value = dict_tracker.data[ids.key]
assert current_value == ids.prev_value, \
    f'Wrong previous value in dict. Got {ids.prev_value}, expected {current_value}.'

# Update value.
dict_tracker.data[ids.key] = ids.new_value
dict_tracker.current_ptr += ids.DictAccess.SIZE"#};

pub const DICT_SQUASH_COPY_DICT: &str = indoc! {r#"# Prepare arguments for dict_new. In particular, the same dictionary values should be copied
# to the new (squashed) dictionary.
vm_enter_scope({
    # Make __dict_manager accessible.
    '__dict_manager': __dict_manager,
    # Create a copy of the dict, in case it changes in the future.
    'initial_dict': dict(__dict_manager.get_dict(ids.dict_accesses_end)),
})"#};

pub const DICT_SQUASH_UPDATE_PTR: &str = indoc! {r#"# Update the DictTracker's current_ptr to point to the end of the squashed dict.
__dict_manager.get_tracker(ids.squashed_dict_start).current_ptr = \
    ids.squashed_dict_end.address_"#};

pub const SQUASH_DICT: &str = indoc! {r#"dict_access_size = ids.DictAccess.SIZE
address = ids.dict_accesses.address_
assert ids.ptr_diff % dict_access_size == 0, \
    'Accesses array size must be divisible by DictAccess.SIZE'
n_accesses = ids.n_accesses
if '__squash_dict_max_size' in globals():
    assert n_accesses <= __squash_dict_max_size, \
        f'squash_dict() can only be used with n_accesses<={__squash_dict_max_size}. ' \
        f'Got: n_accesses={n_accesses}.'
# A map from key to the list of indices accessing it.
access_indices = {}
for i in range(n_accesses):
    key = memory[address + dict_access_size * i]
    access_indices.setdefault(key, []).append(i)
# Descending list of keys.
keys = sorted(access_indices.keys(), reverse=True)
# Are the keys used bigger than range_check bound.
ids.big_keys = 1 if keys[0] >= range_check_builtin.bound else 0
ids.first_key = key = keys.pop()"#};

pub const SQUASH_DICT_INNER_SKIP_LOOP: &str = indoc! {r#"ids.should_skip_loop = 0 if current_access_indices else 1"#};

pub const SQUASH_DICT_INNER_FIRST_ITERATION: &str = indoc! {r#"current_access_indices = sorted(access_indices[key])[::-1]
current_access_index = current_access_indices.pop()
memory[ids.range_check_ptr] = current_access_index"#};

pub const SQUASH_DICT_INNER_CHECK_ACCESS_INDEX: &str = indoc! {r#"new_access_index = current_access_indices.pop()
ids.loop_temps.index_delta_minus1 = new_access_index - current_access_index - 1
current_access_index = new_access_index"#};

pub const SQUASH_DICT_INNER_CONTINUE_LOOP: &str = indoc! {r#"ids.loop_temps.should_continue = 1 if current_access_indices else 0"#};

pub const SQUASH_DICT_INNER_ASSERT_LEN_KEYS: &str = indoc! {r#"assert len(keys) == 0"#};

pub const SQUASH_DICT_INNER_LEN_ASSERT: &str = indoc! {r#"assert len(current_access_indices) == 0"#};

pub const SQUASH_DICT_INNER_USED_ACCESSES_ASSERT: &str = indoc! {r#"assert ids.n_used_accesses == len(access_indices[key])"#};

pub const SQUASH_DICT_INNER_NEXT_KEY: &str = indoc! {r#"assert len(keys) > 0, 'No keys left but remaining_accesses > 0.'
ids.next_key = key = keys.pop()"#};

// Uint256

pub const UINT256_ADD: &str = indoc! {r#"sum_low = ids.a.low + ids.b.low
ids.carry_low = 1 if sum_low >= ids.SHIFT else 0
sum_high = ids.a.high + ids.b.high + ids.carry_low
ids.carry_high = 1 if sum_high >= ids.SHIFT else 0"#};

pub const SPLIT_64: &str = indoc! {r#"ids.low = ids.a & ((1<<64) - 1)
ids.high = ids.a >> 64"#};

pub const UINT256_SQRT: &str = indoc! {r#"from starkware.python.math_utils import isqrt
n = (ids.n.high << 128) + ids.n.low
root = isqrt(n)
assert 0 <= root < 2 ** 128
ids.root.low = root
ids.root.high = 0"#};

pub const UINT256_UNSIGNED_DIV_REM: &str = indoc! {r#"a = (ids.a.high << 128) + ids.a.low
div = (ids.div.high << 128) + ids.div.low
quotient, remainder = divmod(a, div)

ids.quotient.low = quotient & ((1 << 128) - 1)
ids.quotient.high = quotient >> 128
ids.remainder.low = remainder & ((1 << 128) - 1)
ids.remainder.high = remainder >> 128"#};

// Builtins

pub const VERIFY_ECDSA_SIGNATURE: &str = indoc! {r#"ecdsa_builtin.add_signature(ids.ecdsa_ptr.address_, (ids.signature_r, ids.signature_s))"#};

pub const BLAKE2S_COMPUTE: &str = indoc! {r#"from starkware.cairo.common.cairo_blake2s.blake2s_utils import compute_blake2s_func
compute_blake2s_func(segments=segments, output_ptr=ids.output)"#};

// Debugging

pub const PRINT_FELT: &str = indoc! {r#"print(ids.x)"#};
