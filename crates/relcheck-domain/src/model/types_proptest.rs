//! Property-based tests for model types.

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    /// Strategy to generate valid user identifiers in type:id format
    fn valid_user_strategy() -> impl Strategy<Value = String> {
        ("[a-z]{1,10}", "[a-z0-9]{1,20}").prop_map(|(t, id)| format!("{t}:{id}"))
    }

    /// Strategy to generate valid userset references in type:id#relation format
    fn userset_reference_strategy() -> impl Strategy<Value = String> {
        ("[a-z]{1,10}", "[a-z0-9]{1,10}", "[a-z]{1,10}")
            .prop_map(|(t, id, rel)| format!("{t}:{id}#{rel}"))
    }

    proptest! {
        #[test]
        fn test_direct_user_is_not_userset(user in valid_user_strategy()) {
            use crate::model::{is_typed_wildcard, is_userset, is_valid_type_id};
            prop_assert!(!is_userset(&user));
            prop_assert!(!is_typed_wildcard(&user));
            prop_assert!(is_valid_type_id(&user));
        }

        #[test]
        fn test_userset_reference_is_detected(user in userset_reference_strategy()) {
            use crate::model::is_userset;
            prop_assert!(is_userset(&user));
        }

        #[test]
        fn test_type_of_returns_prefix(user_type in "[a-z]{1,10}", id in "[a-z0-9*]{1,10}") {
            use crate::model::type_of;
            let user = format!("{user_type}:{id}");
            prop_assert_eq!(type_of(&user), user_type.as_str());
        }

        #[test]
        fn test_object_parse_roundtrip(
            obj_type in "[a-z]{1,10}",
            obj_id in "[a-z0-9]{1,10}"
        ) {
            use crate::model::Object;
            let input = format!("{obj_type}:{obj_id}");
            let parsed = Object::parse(&input);
            prop_assert!(parsed.is_ok());
            let obj = parsed.unwrap();
            prop_assert_eq!(obj.to_string(), input);
        }
    }
}
