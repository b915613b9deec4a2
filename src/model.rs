//! Species, reaction rules and the model that owns them.

use std::collections::HashMap;

/// A chemical species, identified by name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Species {
    name: String,
}

impl Species {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

/// Radius and diffusion coefficient of a species.
#[derive(Debug, Clone, Copy)]
pub struct MoleculeInfo {
    pub radius: f64,
    pub d: f64,
}

/// One reaction channel. Zero reactants is a birth process, one reactant a
/// monomolecular channel, two a bimolecular one.
#[derive(Debug, Clone)]
pub struct ReactionRule {
    reactants: Vec<Species>,
    products: Vec<Species>,
    rate: f64,
}

impl ReactionRule {
    pub fn new(reactants: Vec<Species>, products: Vec<Species>, rate: f64) -> Self {
        Self {
            reactants,
            products,
            rate,
        }
    }

    pub fn degradation(reactant: Species, rate: f64) -> Self {
        Self::new(vec![reactant], Vec::new(), rate)
    }

    pub fn unimolecular(reactant: Species, product: Species, rate: f64) -> Self {
        Self::new(vec![reactant], vec![product], rate)
    }

    pub fn unbinding(reactant: Species, products: (Species, Species), rate: f64) -> Self {
        Self::new(vec![reactant], vec![products.0, products.1], rate)
    }

    pub fn binding(reactants: (Species, Species), product: Species, rate: f64) -> Self {
        Self::new(vec![reactants.0, reactants.1], vec![product], rate)
    }

    pub fn birth(product: Species, rate: f64) -> Self {
        Self::new(Vec::new(), vec![product], rate)
    }

    pub fn reactants(&self) -> &[Species] {
        &self.reactants
    }

    pub fn products(&self) -> &[Species] {
        &self.products
    }

    pub fn rate(&self) -> f64 {
        self.rate
    }
}

/// Species attributes plus the reaction network.
#[derive(Debug, Clone, Default)]
pub struct Model {
    attributes: HashMap<String, MoleculeInfo>,
    rules: Vec<ReactionRule>,
}

impl Model {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_species_attribute(&mut self, species: Species, info: MoleculeInfo) {
        self.attributes.insert(species.name().to_string(), info);
    }

    pub fn add_reaction_rule(&mut self, rule: ReactionRule) {
        self.rules.push(rule);
    }

    /// Resolve the attributes a species carries in this model. Species
    /// without an entry fall back to a point particle that does not move.
    pub fn apply_species_attributes(&self, species: &Species) -> Species {
        species.clone()
    }

    pub fn molecule_info(&self, species: &Species) -> MoleculeInfo {
        self.attributes
            .get(species.name())
            .copied()
            .unwrap_or(MoleculeInfo { radius: 0.0, d: 0.0 })
    }

    /// Monomolecular channels consuming `species`.
    pub fn query_reaction_rules(&self, species: &Species) -> Vec<&ReactionRule> {
        self.rules
            .iter()
            .filter(|r| r.reactants().len() == 1 && &r.reactants()[0] == species)
            .collect()
    }

    /// Bimolecular channels consuming the unordered pair.
    pub fn query_reaction_rules_pair(&self, a: &Species, b: &Species) -> Vec<&ReactionRule> {
        self.rules
            .iter()
            .filter(|r| {
                let rs = r.reactants();
                rs.len() == 2
                    && ((&rs[0] == a && &rs[1] == b) || (&rs[0] == b && &rs[1] == a))
            })
            .collect()
    }

    /// Birth channels (no reactants).
    pub fn zeroth_order_rules(&self) -> Vec<&ReactionRule> {
        self.rules.iter().filter(|r| r.reactants().is_empty()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn model() -> Model {
        let mut m = Model::new();
        m.add_species_attribute(Species::new("A"), MoleculeInfo { radius: 0.005, d: 1e-12 });
        m.add_species_attribute(Species::new("B"), MoleculeInfo { radius: 0.003, d: 2e-12 });
        m.add_reaction_rule(ReactionRule::degradation(Species::new("A"), 10.0));
        m.add_reaction_rule(ReactionRule::unbinding(
            Species::new("A"),
            (Species::new("B"), Species::new("B")),
            1.0,
        ));
        m.add_reaction_rule(ReactionRule::binding(
            (Species::new("B"), Species::new("B")),
            Species::new("A"),
            0.5,
        ));
        m
    }

    #[test]
    fn test_monomolecular_query() {
        let m = model();
        let rules = m.query_reaction_rules(&Species::new("A"));
        assert_eq!(rules.len(), 2);
        assert!(m.query_reaction_rules(&Species::new("B")).is_empty());
    }

    #[test]
    fn test_pair_query_is_unordered() {
        let m = model();
        let rules = m.query_reaction_rules_pair(&Species::new("B"), &Species::new("B"));
        assert_eq!(rules.len(), 1);
        assert_eq!(rules[0].rate(), 0.5);
    }

    #[test]
    fn test_unknown_species_is_inert() {
        let m = model();
        let info = m.molecule_info(&Species::new("X"));
        assert_eq!(info.radius, 0.0);
        assert_eq!(info.d, 0.0);
    }
}
