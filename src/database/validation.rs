use std::collections::HashSet;

use crate::{
    constants::{MAX_COOKING_TIME, MIN_COOKING_TIME},
    error::{Error, ValidationError},
    schema::{Id, IngredientAmount},
};

/// Ids of the catalog entries a submission refers to that actually exist.
#[derive(Debug, Default)]
pub struct KnownCatalog {
    pub tags: HashSet<Id>,
    pub ingredients: HashSet<Id>,
}

/// Checks a recipe composition against the catalog.
///
/// Every failure is collected; tags are checked first, then ingredient lines,
/// then the cooking time. `cooking_time` is `None` when an update keeps the
/// stored value.
pub fn validate_composition(
    tags: &[Id],
    ingredients: &[IngredientAmount],
    cooking_time: Option<i64>,
    known: &KnownCatalog,
) -> Result<(), Error> {
    let mut errors = vec![];

    if tags.is_empty() {
        errors.push(ValidationError::EmptyTags);
    }
    let mut seen = HashSet::new();
    let mut reported = HashSet::new();
    for tag_id in tags {
        if !seen.insert(*tag_id) {
            if reported.insert(*tag_id) {
                errors.push(ValidationError::DuplicateTag { tag_id: *tag_id });
            }
            continue;
        }
        if !known.tags.contains(tag_id) {
            errors.push(ValidationError::UnknownTag { tag_id: *tag_id });
        }
    }

    if ingredients.is_empty() {
        errors.push(ValidationError::EmptyIngredients);
    }
    let mut seen = HashSet::new();
    let mut reported = HashSet::new();
    for line in ingredients {
        if !seen.insert(line.id) {
            if reported.insert(line.id) {
                errors.push(ValidationError::DuplicateIngredient {
                    ingredient_id: line.id,
                });
            }
            continue;
        }
        if !known.ingredients.contains(&line.id) {
            errors.push(ValidationError::UnknownIngredient {
                ingredient_id: line.id,
            });
        }
        if line.amount <= 0 {
            errors.push(ValidationError::NonPositiveAmount {
                ingredient_id: line.id,
                amount: line.amount,
            });
        }
    }

    if let Some(cooking_time) = cooking_time {
        if !(MIN_COOKING_TIME..=MAX_COOKING_TIME).contains(&cooking_time) {
            errors.push(ValidationError::CookingTimeOutOfRange { cooking_time });
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        log::warn!("Rejected recipe composition: {errors:?}");
        Err(Error::Validation(errors))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn known() -> KnownCatalog {
        KnownCatalog {
            tags: HashSet::from([1, 2, 3]),
            ingredients: HashSet::from([10, 11, 12]),
        }
    }

    fn line(id: Id, amount: i64) -> IngredientAmount {
        IngredientAmount { id, amount }
    }

    fn errors_of(result: Result<(), Error>) -> Vec<ValidationError> {
        match result {
            Err(Error::Validation(errors)) => errors,
            other => panic!("expected validation errors, got {other:?}"),
        }
    }

    #[test]
    fn accepts_a_valid_composition() {
        let result = validate_composition(&[1, 2], &[line(10, 200), line(11, 1)], Some(30), &known());
        assert!(result.is_ok());
    }

    #[test]
    fn reports_every_problem_at_once() {
        let errors = errors_of(validate_composition(
            &[1, 1, 9],
            &[line(10, 0), line(10, 5), line(99, -3)],
            Some(1000),
            &known(),
        ));

        assert_eq!(
            errors,
            vec![
                ValidationError::DuplicateTag { tag_id: 1 },
                ValidationError::UnknownTag { tag_id: 9 },
                ValidationError::NonPositiveAmount {
                    ingredient_id: 10,
                    amount: 0
                },
                ValidationError::DuplicateIngredient { ingredient_id: 10 },
                ValidationError::UnknownIngredient { ingredient_id: 99 },
                ValidationError::NonPositiveAmount {
                    ingredient_id: 99,
                    amount: -3
                },
                ValidationError::CookingTimeOutOfRange { cooking_time: 1000 },
            ]
        );
    }

    #[test]
    fn empty_sets_are_rejected() {
        let errors = errors_of(validate_composition(&[], &[], Some(10), &known()));
        assert_eq!(
            errors,
            vec![ValidationError::EmptyTags, ValidationError::EmptyIngredients]
        );
    }

    #[test]
    fn duplicate_is_reported_once_per_id() {
        let errors = errors_of(validate_composition(&[2, 2, 2], &[line(10, 1)], None, &known()));
        assert_eq!(errors, vec![ValidationError::DuplicateTag { tag_id: 2 }]);
    }

    #[test]
    fn cooking_time_bounds_are_inclusive() {
        assert!(validate_composition(&[1], &[line(10, 1)], Some(1), &known()).is_ok());
        assert!(validate_composition(&[1], &[line(10, 1)], Some(999), &known()).is_ok());
        let errors = errors_of(validate_composition(&[1], &[line(10, 1)], Some(0), &known()));
        assert_eq!(
            errors,
            vec![ValidationError::CookingTimeOutOfRange { cooking_time: 0 }]
        );
    }

    #[test]
    fn kept_cooking_time_is_not_checked() {
        assert!(validate_composition(&[1], &[line(10, 1)], None, &known()).is_ok());
    }
}
