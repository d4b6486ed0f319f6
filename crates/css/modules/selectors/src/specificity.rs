//! CSS selector specificity calculation.
//! Reference: <https://www.w3.org/TR/selectors-3/#specificity>

use crate::{ComplexSelector, CompoundSelector, SimpleSelector};
use core::ops::Add;

/// Specificity triple (a, b, c): ids, classes/attributes/pseudo-classes, types/pseudo-elements.
/// Calculating a selector's specificity (section 9)
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Default, Hash)]
pub struct Specificity(pub u16, pub u16, pub u16);

impl Add for Specificity {
    type Output = Self;

    fn add(self, other: Self) -> Self {
        Self(
            self.0.saturating_add(other.0),
            self.1.saturating_add(other.1),
            self.2.saturating_add(other.2),
        )
    }
}

/// Compute the specificity of a compound selector.
/// The universal selector adds nothing; `:not()` counts its argument.
pub fn specificity_of_compound(compound: &CompoundSelector) -> Specificity {
    compound
        .simples
        .iter()
        .fold(Specificity::default(), |total, simple| {
            total + specificity_of_simple(simple)
        })
}

fn specificity_of_simple(simple: &SimpleSelector) -> Specificity {
    match simple {
        SimpleSelector::IdSelector(_) => Specificity(1, 0, 0),
        SimpleSelector::Class(_)
        | SimpleSelector::Attribute(_)
        | SimpleSelector::PseudoClass(_) => Specificity(0, 1, 0),
        SimpleSelector::Type(_) | SimpleSelector::PseudoElement(_) => Specificity(0, 0, 1),
        SimpleSelector::Universal => Specificity::default(),
        SimpleSelector::Negation(inner) => specificity_of_compound(inner),
    }
}

/// Compute the specificity of a complex selector (sum of its compounds).
/// Combinators do not contribute.
pub fn specificity_of_complex(sel: &ComplexSelector) -> Specificity {
    sel.compounds()
        .fold(Specificity::default(), |total, compound| {
            total + specificity_of_compound(compound)
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse_complex_selector;
    use core::error::Error;

    fn of(selector: &str) -> Result<Specificity, Box<dyn Error>> {
        Ok(specificity_of_complex(&parse_complex_selector(selector)?))
    }

    #[test]
    fn counts_each_category() -> Result<(), Box<dyn Error>> {
        assert_eq!(of("*")?, Specificity(0, 0, 0));
        assert_eq!(of("li")?, Specificity(0, 0, 1));
        assert_eq!(of("ul li")?, Specificity(0, 0, 2));
        assert_eq!(of("ul ol + li")?, Specificity(0, 0, 3));
        assert_eq!(of("h1 + *[rel=up]")?, Specificity(0, 1, 1));
        assert_eq!(of("ul ol li.red")?, Specificity(0, 1, 3));
        assert_eq!(of("li.red.level")?, Specificity(0, 2, 1));
        assert_eq!(of("#x34y")?, Specificity(1, 0, 0));
        assert_eq!(of("#s12:not(FOO)")?, Specificity(1, 0, 1));
        assert_eq!(of("p:first-child::before")?, Specificity(0, 1, 2));
        Ok(())
    }

    #[test]
    fn combinator_kind_does_not_matter() -> Result<(), Box<dyn Error>> {
        assert_eq!(of("div > p")?, of("div ~ p")?);
        assert_eq!(of("div p")?, of("div + p")?);
        Ok(())
    }

    #[test]
    fn orders_lexicographically() {
        assert!(Specificity(1, 0, 0) > Specificity(0, 9, 9));
        assert!(Specificity(0, 1, 0) > Specificity(0, 0, 9));
    }
}
