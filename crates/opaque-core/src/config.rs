//! Non-secret, caller-supplied protocol options.

/// Upper bound on the sealed `extra` payload, chosen to keep envelope
/// sizing arithmetic (`extra_len` as `u64`) free of realistic overflow.
pub const MAX_EXTRA_LEN: usize = 1024;

#[derive(Debug, Clone, Default)]
pub struct Identities<'a> {
    pub id_u: &'a [u8],
    pub id_s: &'a [u8],
}

#[derive(Debug, Clone, Default)]
pub struct ProtocolInfo<'a> {
    pub info1: &'a [u8],
    pub info2: &'a [u8],
    pub info3: &'a [u8],
    pub einfo2: &'a [u8],
    pub einfo3: &'a [u8],
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KdfParams {
    pub m_cost_kib: u32,
    pub t_cost: u32,
    pub p_cost: u32,
}

impl KdfParams {
    pub fn interactive() -> Self {
        Self {
            m_cost_kib: crate::primitives::KDF_MEMORY_COST_KIB,
            t_cost: crate::primitives::KDF_TIME_COST,
            p_cost: crate::primitives::KDF_PARALLELISM,
        }
    }
}

impl Default for KdfParams {
    fn default() -> Self {
        Self::interactive()
    }
}
