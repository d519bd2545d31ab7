//! CRC-32 combination without recomputing either input.
//!
//! `crc32_combine` answers: given `crc32(A)`, `crc32(B)` and `len(B)`, what
//! is `crc32(A ++ B)`? Appending `len(B)` bytes to A shifts A's CRC register
//! through that many zero bytes (B's actual values enter through the final
//! XOR). The register update for one zero bit is linear over GF(2), so it
//! can be represented as a 32x32 bit matrix; squaring that matrix doubles
//! the number of zero bits it applies, which lets the shift run in
//! O(log len(B)) matrix products instead of feeding len(B) zero bytes
//! through a table.

/// Reflected CRC-32 polynomial (IEEE 802.3), as used by gzip.
const POLY: u32 = 0xEDB8_8320;

const GF2_DIM: usize = 32;

/// Multiply the GF(2) matrix `mat` by the bit vector `vec`.
fn gf2_matrix_times(mat: &[u32; GF2_DIM], mut vec: u32) -> u32 {
    let mut sum = 0;
    let mut row = 0;
    while vec != 0 {
        if vec & 1 != 0 {
            sum ^= mat[row];
        }
        vec >>= 1;
        row += 1;
    }
    sum
}

/// Square `mat` into `square`.
fn gf2_matrix_square(square: &mut [u32; GF2_DIM], mat: &[u32; GF2_DIM]) {
    for n in 0..GF2_DIM {
        square[n] = gf2_matrix_times(mat, mat[n]);
    }
}

/// Combine two CRC-32 values.
///
/// Returns the CRC of `A ++ B` given `crc1 = crc32(A)`, `crc2 = crc32(B)`
/// and `len2 = B.len()` in bytes. `len2 == 0` returns `crc1` unchanged.
pub fn crc32_combine(crc1: u32, crc2: u32, len2: u64) -> u32 {
    if len2 == 0 {
        return crc1;
    }

    let mut even = [0u32; GF2_DIM];
    let mut odd = [0u32; GF2_DIM];

    // Operator for a single zero bit: the register shifts right one place
    // and conditionally folds the polynomial back in.
    odd[0] = POLY;
    let mut row: u32 = 1;
    for cell in odd.iter_mut().skip(1) {
        *cell = row;
        row <<= 1;
    }

    // Two zero bits, then four.
    gf2_matrix_square(&mut even, &odd);
    gf2_matrix_square(&mut odd, &even);

    // Walk the bits of len2. The first squaring below yields the operator
    // for eight zero bits, one whole byte, so the k-th loop iteration
    // applies 2^k zero bytes whenever the matching bit of len2 is set.
    let mut crc = crc1;
    let mut len = len2;
    loop {
        gf2_matrix_square(&mut even, &odd);
        if len & 1 != 0 {
            crc = gf2_matrix_times(&even, crc);
        }
        len >>= 1;
        if len == 0 {
            break;
        }

        gf2_matrix_square(&mut odd, &even);
        if len & 1 != 0 {
            crc = gf2_matrix_times(&odd, crc);
        }
        len >>= 1;
        if len == 0 {
            break;
        }
    }

    crc ^ crc2
}
