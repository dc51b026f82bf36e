// document
/// Declare a document type: a unit struct, its `Document` impl, and one
/// typed `FieldRef` constant per field.
///
/// ```ignore
/// document! {
///     pub Order as "Order" in "orders" {
///         ID: "Id" => Ulid (Identifier),
///         STORE_ID: "StoreId" as "store_id" => Ulid,
///         NOTE: "Note" => Text (nullable),
///         DELETED: "Deleted" => Timestamp (nullable, Deleted),
///     }
/// }
/// ```
///
/// Field options are `nullable` or any `FieldRole` variant name.
#[macro_export]
macro_rules! document {
    (@field $field:expr ;) => {
        $field
    };

    (@field $field:expr ; nullable $(, $rest:ident)*) => {
        $crate::document!(@field $field.nullable() ; $($rest),*)
    };

    (@field $field:expr ; $role:ident $(, $rest:ident)*) => {
        $crate::document!(
            @field $field.role($crate::model::FieldRole::$role) ; $($rest),*
        )
    };

    (
        $(#[$meta:meta])*
        $vis:vis $ty:ident as $name:literal in $storage:literal {
            $(
                $konst:ident : $field:literal $(as $field_storage:literal)?
                    => $kind:ident $(( $($opt:ident),* $(,)? ))?
            ),* $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Debug, Default)]
        $vis struct $ty;

        impl $ty {
            $(
                $vis const $konst: $crate::path::FieldRef<$ty> = $crate::path::FieldRef::new($field);
            )*
        }

        impl $crate::traits::Document for $ty {
            const MODEL: &'static $crate::model::DocumentModel = &$crate::model::DocumentModel {
                path: concat!(module_path!(), "::", stringify!($ty)),
                name: $name,
                storage_name: $storage,
                fields: &[
                    $(
                        $crate::document!(
                            @field
                            $crate::model::FieldModel::new(
                                $field,
                                $crate::model::FieldKind::$kind,
                            ) $(.storage($field_storage))?
                            ; $($($opt),*)?
                        ),
                    )*
                ],
            };
        }
    };
}
