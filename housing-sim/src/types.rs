use serde::{Deserialize, Serialize};
use slotmap::{Key, KeyData, new_key_type};
use tsify_next::Tsify;

// ============================================================================
// IDs - Using slotmap for generational indices
// ============================================================================

new_key_type! {
    pub struct UnitId;
    pub struct TenantId;
    pub struct LandlordId;
}

/// Trait for converting SlotMap keys to u64 for the WASM / snapshot boundary
pub trait KeyToU64 {
    fn to_u64(self) -> u64;
}

/// Inverse of [`KeyToU64`], used when commands arrive carrying raw ids
pub trait KeyFromU64 {
    fn from_u64(raw: u64) -> Self;
}

macro_rules! ffi_key {
    ($($ty:ty),*) => {
        $(
            impl KeyToU64 for $ty {
                fn to_u64(self) -> u64 {
                    self.data().as_ffi()
                }
            }

            impl KeyFromU64 for $ty {
                fn from_u64(raw: u64) -> Self {
                    Self::from(KeyData::from_ffi(raw))
                }
            }
        )*
    };
}

ffi_key!(UnitId, TenantId, LandlordId);

/// Index into the configured neighborhood list
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct NeighborhoodId(pub u32);

impl NeighborhoodId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Index into the city's building list
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct BuildingId(pub u32);

/// Grid coordinate as (row, col)
pub type Position = (usize, usize);

/// Tick counter; one tick is one month
pub type Month = u64;

// ============================================================================
// Zoning
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Tsify)]
#[tsify(into_wasm_abi, from_wasm_abi)]
pub enum ParcelType {
    Residential,
    Commercial,
    Park,
    River,
}

impl ParcelType {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "Residential" => Some(Self::Residential),
            "Commercial" => Some(Self::Commercial),
            "Park" => Some(Self::Park),
            "River" => Some(Self::River),
            _ => None,
        }
    }
}

// ============================================================================
// Ownership
// ============================================================================

/// Anything that can hold units. The derived ordering (Landlord < Tenant <
/// Collective, then by key) is the tie-break used when bids are equal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Owner {
    Landlord(LandlordId),
    Tenant(TenantId),
    Collective,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Tsify)]
#[tsify(into_wasm_abi)]
pub enum OwnerKind {
    Landlord,
    Tenant,
    Collective,
}

impl Owner {
    pub fn kind(self) -> OwnerKind {
        match self {
            Owner::Landlord(_) => OwnerKind::Landlord,
            Owner::Tenant(_) => OwnerKind::Tenant,
            Owner::Collective => OwnerKind::Collective,
        }
    }

    /// Raw id for snapshots; the Collective is always 0
    pub fn raw_id(self) -> u64 {
        match self {
            Owner::Landlord(id) => id.to_u64(),
            Owner::Tenant(id) => id.to_u64(),
            Owner::Collective => 0,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Owner::Landlord(_) => "landlord",
            Owner::Tenant(_) => "tenant",
            Owner::Collective => "collective",
        }
    }
}

/// Owner identity as it crosses the wasm / snapshot boundary
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Tsify)]
#[tsify(into_wasm_abi)]
pub struct OwnerRef {
    pub id: u64,
    pub kind: OwnerKind,
}

impl From<Owner> for OwnerRef {
    fn from(owner: Owner) -> Self {
        Self {
            id: owner.raw_id(),
            kind: owner.kind(),
        }
    }
}
