//! AES-CCM* authenticated encryption core
//!
//! Deliberately hand-rolled on top of the bare AES-128 block primitive
//! instead of a generic AEAD crate: the ZigBee transform feeds this core a
//! nonce built from frame fields and authenticates the 802.15.4 header
//! itself, and the exact counter-block and CBC-MAC constructions below are
//! what real ZigBee stacks interoperate with.
//!
//! The mode follows the classic CCM construction with a 13-byte nonce and
//! 2-byte length field: `B_0 = flags ‖ nonce ‖ msg_len`, associated data
//! length-prefixed and zero-padded, CBC-MAC from a zero IV, and a CTR
//! keystream whose block 0 encrypts the MIC.

use aes::cipher::generic_array::GenericArray;
use aes::cipher::{BlockEncrypt, KeyInit};
use aes::Aes128;
use hornet_core::{Error, Result};

/// AES block size in bytes
const BLOCK: usize = 16;

/// Nonce size fixed by the 2-byte length field (15 - L)
pub const NONCE_LEN: usize = 13;

/// Required key size
pub const KEY_LEN: usize = 16;

fn cipher_for(key: &[u8]) -> Result<Aes128> {
    if key.len() != KEY_LEN {
        return Err(Error::BadKeyLength(key.len()));
    }
    Ok(Aes128::new(GenericArray::from_slice(key)))
}

fn encrypt_block(cipher: &Aes128, block: &mut [u8; BLOCK]) {
    let ga = GenericArray::from_mut_slice(block);
    cipher.encrypt_block(ga);
}

/// `A_i` counter block: flags 0x01 (L - 1), nonce, big-endian counter
fn counter_block(nonce: &[u8; NONCE_LEN], counter: u16) -> [u8; BLOCK] {
    let mut block = [0u8; BLOCK];
    block[0] = 0x01;
    block[1..1 + NONCE_LEN].copy_from_slice(nonce);
    block[BLOCK - 2..].copy_from_slice(&counter.to_be_bytes());
    block
}

/// CBC-MAC tag over `B_0 ‖ adata-blocks ‖ payload-blocks`, zero IV
fn cbc_mac(
    cipher: &Aes128,
    nonce: &[u8; NONCE_LEN],
    adata: &[u8],
    payload: &[u8],
    mic_len: usize,
) -> [u8; BLOCK] {
    let mut b0 = [0u8; BLOCK];
    b0[0] = auth_flags(!adata.is_empty(), mic_len);
    b0[1..1 + NONCE_LEN].copy_from_slice(nonce);
    b0[BLOCK - 2..].copy_from_slice(&(payload.len() as u16).to_be_bytes());

    // 2-byte length prefix, then the associated data, zero-padded out to
    // the block boundary
    let mut auth = Vec::with_capacity(2 + adata.len() + payload.len() + 2 * BLOCK);
    if !adata.is_empty() {
        auth.extend_from_slice(&(adata.len() as u16).to_be_bytes());
        auth.extend_from_slice(adata);
        while auth.len() % BLOCK != 0 {
            auth.push(0);
        }
    }
    auth.extend_from_slice(payload);
    while auth.len() % BLOCK != 0 {
        auth.push(0);
    }

    let mut mac = b0;
    encrypt_block(cipher, &mut mac);
    for chunk in auth.chunks(BLOCK) {
        for (m, c) in mac.iter_mut().zip(chunk) {
            *m ^= c;
        }
        encrypt_block(cipher, &mut mac);
    }
    mac
}

/// Authentication flags byte: `0x40·has_adata + 8·((M - 2) / 2) + (L - 1)`
fn auth_flags(has_adata: bool, mic_len: usize) -> u8 {
    let adata_bit = if has_adata { 0x40 } else { 0x00 };
    adata_bit | (((mic_len as u8 - 2) / 2) << 3) | 0x01
}

/// XOR `data` against the CTR keystream starting at block `A_1`
fn ctr_xor(cipher: &Aes128, nonce: &[u8; NONCE_LEN], data: &mut [u8]) {
    for (i, chunk) in data.chunks_mut(BLOCK).enumerate() {
        let mut keystream = counter_block(nonce, (i + 1) as u16);
        encrypt_block(cipher, &mut keystream);
        for (d, k) in chunk.iter_mut().zip(keystream.iter()) {
            *d ^= k;
        }
    }
}

/// Encrypt and authenticate `plaintext`, returning `(ciphertext, mic)`.
///
/// `adata` is authenticated but not encrypted. `mic_len` must be one of
/// 4, 6, 8, 10, 12, 14, 16.
pub fn encrypt(
    key: &[u8],
    nonce: &[u8; NONCE_LEN],
    adata: &[u8],
    plaintext: &[u8],
    mic_len: usize,
) -> Result<(Vec<u8>, Vec<u8>)> {
    let cipher = cipher_for(key)?;

    let tag = cbc_mac(&cipher, nonce, adata, plaintext, mic_len);
    let mut s0 = counter_block(nonce, 0);
    encrypt_block(&cipher, &mut s0);
    let mic: Vec<u8> = tag
        .iter()
        .zip(s0.iter())
        .take(mic_len)
        .map(|(t, s)| t ^ s)
        .collect();

    let mut ciphertext = plaintext.to_vec();
    ctr_xor(&cipher, nonce, &mut ciphertext);
    Ok((ciphertext, mic))
}

/// Decrypt `ciphertext` and verify `mic`, returning the plaintext.
///
/// A MIC mismatch is [`Error::AuthenticationFailure`]: the frame was
/// well-formed, the key or tag was not, and no plaintext is released.
pub fn decrypt(
    key: &[u8],
    nonce: &[u8; NONCE_LEN],
    adata: &[u8],
    ciphertext: &[u8],
    mic: &[u8],
) -> Result<Vec<u8>> {
    let cipher = cipher_for(key)?;

    let mut plaintext = ciphertext.to_vec();
    ctr_xor(&cipher, nonce, &mut plaintext);

    let mut s0 = counter_block(nonce, 0);
    encrypt_block(&cipher, &mut s0);
    let observed: Vec<u8> = mic.iter().zip(s0.iter()).map(|(u, s)| u ^ s).collect();

    let tag = cbc_mac(&cipher, nonce, adata, &plaintext, mic.len());
    if observed != tag[..mic.len()] {
        return Err(Error::AuthenticationFailure);
    }
    Ok(plaintext)
}
