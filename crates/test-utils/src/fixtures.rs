//! Account keys used by the end-to-end scenarios.

/// BIP84 account key on Bitcoin mainnet.
pub const BIP84_MAINNET_XPUB: &str = "xpub6CMeLkY9TzXyLYXPWMXB5LWtprVABb6HwPEPXnEgESMNrSUBsvhXNsA7zKS1ZRKhUyQG4HjZysEP8v7gDNU4J6PvN5yLx4meEm3mpEapLMN";

/// BIP44 account key on Bitcoin mainnet.
pub const BIP44_MAINNET_XPUB: &str = "xpub6DCi5iJ57ZPd5qPzvTm5hUt6X23TJdh9H4NjNsNbt7t7UuTMJfawQWsdWRFhfLwkiMkB1rQ4ZJWLB9YBnzR7kbs9N8b2PsKZgKUHQm1X4or";

/// BIP44 account key on Bitcoin testnet3.
pub const BIP44_TESTNET_TPUB: &str = "tpubDC5FSnBiZDMmhiuCmWAYsLwgLYrrT9rAqvTySfuCCrgsWz8wxMXUS9Tb9iVMvcRbvFcAHGkMD5Kx8koh4GquNGNTfohfk7pgjhaPCdXpoba";

/// BIP49 account key on Bitcoin testnet3.
pub const BIP49_TESTNET_TPUB: &str = "tpubDCcvqEHx7prGddpWTfEviiew5YLMrrKy4oJbt14teJZenSi6AYMAs2SNXwYXFzkrNYwECSmobwxESxMCrpfqw4gsUt88bcr8iMrJmbb8P2q";
