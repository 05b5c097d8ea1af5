use std::collections::HashMap;

/// A bounded two-way name/address table, resolved at broadcast time so the
/// AMM core never has to know about test fixture naming (`"MASTER"`,
/// `"VAULT"`, `"PROVIDER-1"`, …).
#[derive(Debug, Clone, Default)]
pub struct AliasTable {
    by_name: HashMap<String, String>,
    by_address: HashMap<String, String>,
}

impl AliasTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, name: impl Into<String>, address: impl Into<String>) {
        let (name, address) = (name.into(), address.into());
        self.by_address.insert(address.clone(), name.clone());
        self.by_name.insert(name, address);
    }

    pub fn address_of(&self, name: &str) -> Option<&str> {
        self.by_name.get(name).map(String::as_str)
    }

    pub fn name_of(&self, address: &str) -> Option<&str> {
        self.by_address.get(address).map(String::as_str)
    }

    /// Resolves `s` to an address if it names a known alias, else returns
    /// `s` unchanged (it is presumably already an address).
    pub fn resolve<'a>(&'a self, s: &'a str) -> &'a str {
        self.address_of(s).unwrap_or(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_known_aliases_and_passes_through_unknown_ones() {
        let mut table = AliasTable::new();
        table.register("VAULT", "bnb1vault000");
        assert_eq!(table.resolve("VAULT"), "bnb1vault000");
        assert_eq!(table.resolve("bnb1someoneelse"), "bnb1someoneelse");
    }
}
