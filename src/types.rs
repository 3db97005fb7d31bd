use std::{fmt, str::FromStr};

use serde::{de::Visitor, Deserialize, Deserializer};

use crate::{Error, Param, Result};

/// ABI type tree.
///
/// Tuple fields keep their names and `indexed` flags so a single tree can
/// describe function inputs, event inputs and nested structs. The canonical
/// textual form used in signatures is given by the `Display` impl and never
/// includes field names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Type {
    Uint(usize),
    Int(usize),
    Address,
    Bool,
    String,
    FixedBytes(usize),
    Bytes,
    FixedArray(Box<Type>, usize),
    Array(Box<Type>),
    Tuple(Vec<Param>),
}

impl Type {
    /// Builds a tuple of unnamed, non-indexed fields.
    pub fn tuple<I>(tys: I) -> Type
    where
        I: IntoIterator<Item = Type>,
    {
        Type::Tuple(tys.into_iter().map(|ty| Param::new("", ty)).collect())
    }

    /// Whether values of this type are encoded out of line, behind an
    /// offset stored in the head.
    pub fn is_dynamic(&self) -> bool {
        match self {
            Type::String | Type::Bytes | Type::Array(_) => true,
            Type::FixedArray(ty, _) => ty.is_dynamic(),
            Type::Tuple(params) => params.iter().any(|param| param.type_.is_dynamic()),
            Type::Uint(_) | Type::Int(_) | Type::Address | Type::Bool | Type::FixedBytes(_) => {
                false
            }
        }
    }

    /// Number of bytes this type takes in the head of its enclosing tuple.
    pub fn head_len(&self) -> usize {
        if self.is_dynamic() {
            return 32;
        }

        match self {
            Type::FixedArray(ty, size) => ty.head_len().saturating_mul(*size),
            Type::Tuple(params) => params
                .iter()
                .fold(0, |acc, param| acc.saturating_add(param.type_.head_len())),
            _ => 32,
        }
    }

    // Wraps `self` in arrays, innermost suffix first, e.g. `[2][]` turns `T`
    // into `T[2][]`.
    fn with_array_sizes(self, sizes: Vec<Option<usize>>) -> Type {
        sizes.into_iter().fold(self, |ty, size| match size {
            None => Type::Array(Box::new(ty)),
            Some(size) => Type::FixedArray(Box::new(ty), size),
        })
    }

    /// Applies an array suffix such as `[]` or `[3][]` to `self`. Used for
    /// descriptor entries of type `tuple[]` whose base type comes from
    /// `components`.
    pub(crate) fn with_array_suffix(self, suffix: &str) -> Result<Type> {
        let (_, sizes) = parsers::parse_exact_array_suffix(suffix)
            .map_err(|_| Error::parse(format!("invalid array suffix `{}`", suffix)))?;

        Ok(self.with_array_sizes(sizes))
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::Uint(size) => write!(f, "uint{}", size),
            Type::Int(size) => write!(f, "int{}", size),
            Type::Address => write!(f, "address"),
            Type::Bool => write!(f, "bool"),
            Type::String => write!(f, "string"),
            Type::FixedBytes(size) => write!(f, "bytes{}", size),
            Type::Bytes => write!(f, "bytes"),
            Type::FixedArray(ty, size) => write!(f, "{}[{}]", ty, size),
            Type::Array(ty) => write!(f, "{}[]", ty),
            Type::Tuple(params) => {
                write!(f, "(")?;
                for (i, param) in params.iter().enumerate() {
                    if i > 0 {
                        write!(f, ",")?;
                    }
                    write!(f, "{}", param.type_)?;
                }
                write!(f, ")")
            }
        }
    }
}

impl FromStr for Type {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        parsers::parse_exact_type(s.trim())
            .map(|(_, ty)| ty)
            .map_err(|_| Error::parse(format!("invalid type `{}`", s)))
    }
}

impl<'de> Deserialize<'de> for Type {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_str(TypeVisitor)
    }
}

struct TypeVisitor;

impl<'de> Visitor<'de> for TypeVisitor {
    type Value = Type;

    fn expecting(&self, formatter: &mut std::fmt::Formatter) -> std::fmt::Result {
        formatter.write_str("an ABI type")
    }

    fn visit_str<E>(self, v: &str) -> std::result::Result<Self::Value, E>
    where
        E: serde::de::Error,
    {
        v.parse().map_err(serde::de::Error::custom)
    }
}

/// A human readable declaration such as
/// `transfer(address to, uint256 amount) returns (bool)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Signature {
    pub name: String,
    pub inputs: Vec<Param>,
    pub outputs: Option<Vec<Param>>,
    pub anonymous: bool,
}

impl FromStr for Signature {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        parsers::parse_exact_signature(s.trim())
            .map(|(_, sig)| sig)
            .map_err(|_| Error::parse(format!("invalid signature `{}`, expected `name(types)`", s)))
    }
}

mod parsers {
    use nom::{
        branch::alt,
        bytes::complete::{tag, take_while},
        character::complete::{char, digit1, multispace0, multispace1, satisfy},
        combinator::{all_consuming, map, map_res, not, opt, recognize, verify},
        multi::{many0, separated_list0, separated_list1},
        sequence::{delimited, pair, preceded, terminated, tuple},
        IResult,
    };

    use super::{Signature, Type};
    use crate::params::{has_unique_names, Param};

    pub fn parse_exact_type(input: &str) -> IResult<&str, Type> {
        all_consuming(parse_type)(input)
    }

    pub fn parse_exact_array_suffix(input: &str) -> IResult<&str, Vec<Option<usize>>> {
        all_consuming(many0(parse_array_size))(input)
    }

    pub fn parse_exact_signature(input: &str) -> IResult<&str, Signature> {
        let returns = preceded(
            tuple((multispace0, keyword("returns"), multispace0)),
            parse_params,
        );
        let anonymous = preceded(multispace0, keyword("anonymous"));

        all_consuming(tuple((
            terminated(parse_identifier, multispace0),
            parse_params,
            opt(returns),
            opt(anonymous),
        )))(input)
        .map(|(i, (name, inputs, outputs, anonymous))| {
            let sig = Signature {
                name: name.to_string(),
                inputs,
                outputs,
                anonymous: anonymous.is_some(),
            };

            (i, sig)
        })
    }

    fn parse_type(input: &str) -> IResult<&str, Type> {
        let (i, ty) = alt((parse_tuple, parse_simple_type))(input)?;
        let (i, sizes) = many0(parse_array_size)(i)?;

        Ok((i, ty.with_array_sizes(sizes)))
    }

    fn parse_simple_type(input: &str) -> IResult<&str, Type> {
        terminated(
            alt((
                parse_uint,
                parse_int,
                parse_bytes,
                parse_string,
                parse_address,
                parse_bool,
            )),
            not(satisfy(is_ident_char)),
        )(input)
    }

    fn parse_uint(input: &str) -> IResult<&str, Type> {
        verify(parse_sized("uint"), check_int_size)(input).map(|(i, size)| (i, Type::Uint(size)))
    }

    fn parse_int(input: &str) -> IResult<&str, Type> {
        verify(parse_sized("int"), check_int_size)(input).map(|(i, size)| (i, Type::Int(size)))
    }

    fn parse_address(input: &str) -> IResult<&str, Type> {
        tag("address")(input).map(|(i, _)| (i, Type::Address))
    }

    fn parse_bool(input: &str) -> IResult<&str, Type> {
        tag("bool")(input).map(|(i, _)| (i, Type::Bool))
    }

    fn parse_string(input: &str) -> IResult<&str, Type> {
        tag("string")(input).map(|(i, _)| (i, Type::String))
    }

    fn parse_bytes(input: &str) -> IResult<&str, Type> {
        let (i, _) = tag("bytes")(input)?;
        let (i, size) = opt(verify(parse_integer, check_fixed_bytes_size))(i)?;

        let ty = size.map_or(Type::Bytes, Type::FixedBytes);

        Ok((i, ty))
    }

    fn parse_array_size(input: &str) -> IResult<&str, Option<usize>> {
        delimited(
            char('['),
            opt(verify(parse_integer, |size: &usize| *size > 0)),
            char(']'),
        )(input)
    }

    // Tuple types need at least one component.
    fn parse_tuple(input: &str) -> IResult<&str, Type> {
        preceded(
            opt(tag("tuple")),
            param_list(separated_list1(parse_comma, parse_param)),
        )(input)
        .map(|(i, params)| (i, Type::Tuple(params)))
    }

    // Function and event parameter lists, which may be empty.
    fn parse_params(input: &str) -> IResult<&str, Vec<Param>> {
        param_list(separated_list0(parse_comma, parse_param))(input)
    }

    fn param_list<'a, F>(list: F) -> impl FnMut(&'a str) -> IResult<&'a str, Vec<Param>>
    where
        F: FnMut(&'a str) -> IResult<&'a str, Vec<Param>>,
    {
        verify(
            delimited(
                terminated(char('('), multispace0),
                list,
                preceded(multispace0, char(')')),
            ),
            |params: &Vec<Param>| has_unique_names(params),
        )
    }

    fn parse_comma(input: &str) -> IResult<&str, char> {
        delimited(multispace0, char(','), multispace0)(input)
    }

    // A tuple component: `type [indexed] [name]`.
    fn parse_param(input: &str) -> IResult<&str, Param> {
        let (i, type_) = parse_type(input)?;
        let (i, indexed) = opt(preceded(multispace1, keyword("indexed")))(i)?;
        let (i, name) = opt(preceded(multispace1, parse_identifier))(i)?;

        let param = Param {
            name: name.unwrap_or_default().to_string(),
            type_,
            indexed: indexed.is_some(),
        };

        Ok((i, param))
    }

    fn parse_identifier(input: &str) -> IResult<&str, &str> {
        recognize(pair(satisfy(is_ident_start), take_while(is_ident_char)))(input)
    }

    fn keyword<'a>(kw: &'static str) -> impl FnMut(&'a str) -> IResult<&'a str, &'a str> {
        terminated(tag(kw), not(satisfy(is_ident_char)))
    }

    // `uint` and `int` without a width are aliases for the 256 bit types.
    fn parse_sized<'a>(t: &'a str) -> impl Fn(&'a str) -> IResult<&'a str, usize> {
        move |input: &str| {
            let (i, _) = tag(t)(input)?;

            map(opt(parse_integer), |size| size.unwrap_or(256))(i)
        }
    }

    fn parse_integer(input: &str) -> IResult<&str, usize> {
        map_res(digit1, str::parse)(input)
    }

    fn is_ident_start(c: char) -> bool {
        c.is_ascii_alphabetic() || c == '_' || c == '$'
    }

    fn is_ident_char(c: char) -> bool {
        c.is_ascii_alphanumeric() || c == '_' || c == '$'
    }

    fn check_int_size(i: &usize) -> bool {
        let i = *i;

        i > 0 && i <= 256 && i % 8 == 0
    }

    fn check_fixed_bytes_size(i: &usize) -> bool {
        let i = *i;

        i > 0 && i <= 32
    }

    #[cfg(test)]
    mod test {
        use super::super::*;
        use super::*;

        #[test]
        fn parse_uint() {
            for i in (8..=256).step_by(8) {
                let s = format!("uint{}", i);

                assert_eq!(parse_exact_type(&s), Ok(("", Type::Uint(i))));
            }

            assert_eq!(parse_exact_type("uint"), Ok(("", Type::Uint(256))));
            assert!(parse_exact_type("uint7").is_err());
            assert!(parse_exact_type("uint264").is_err());
            assert!(parse_exact_type("uint0").is_err());
        }

        #[test]
        fn parse_int() {
            for i in (8..=256).step_by(8) {
                let s = format!("int{}", i);

                assert_eq!(parse_exact_type(&s), Ok(("", Type::Int(i))));
            }

            assert_eq!(parse_exact_type("int"), Ok(("", Type::Int(256))));
            assert!(parse_exact_type("int12").is_err());
        }

        #[test]
        fn parse_address() {
            assert_eq!(parse_exact_type("address"), Ok(("", Type::Address)));
            assert!(parse_exact_type("addresses").is_err());
        }

        #[test]
        fn parse_bool() {
            assert_eq!(parse_exact_type("bool"), Ok(("", Type::Bool)));
        }

        #[test]
        fn parse_string() {
            assert_eq!(parse_exact_type("string"), Ok(("", Type::String)));
        }

        #[test]
        fn parse_bytes() {
            assert_eq!(parse_exact_type("bytes"), Ok(("", Type::Bytes)));

            for i in 1..=32 {
                let s = format!("bytes{}", i);

                assert_eq!(parse_exact_type(&s), Ok(("", Type::FixedBytes(i))));
            }

            assert!(parse_exact_type("bytes33").is_err());
            assert!(parse_exact_type("bytes0").is_err());
        }

        #[test]
        fn parse_array() {
            assert_eq!(
                parse_exact_type("uint256[]"),
                Ok(("", Type::Array(Box::new(Type::Uint(256)))))
            );

            // Nested arrays
            assert_eq!(
                parse_exact_type("address[][]"),
                Ok((
                    "",
                    Type::Array(Box::new(Type::Array(Box::new(Type::Address))))
                ))
            );

            // Mixed arrays
            assert_eq!(
                parse_exact_type("string[2][]"),
                Ok((
                    "",
                    Type::Array(Box::new(Type::FixedArray(Box::new(Type::String), 2)))
                ))
            );
            assert_eq!(
                parse_exact_type("string[][3]"),
                Ok((
                    "",
                    Type::FixedArray(Box::new(Type::Array(Box::new(Type::String))), 3)
                ))
            );

            assert!(parse_exact_type("uint256[0]").is_err());
            assert!(parse_exact_type("uint256[").is_err());
        }

        #[test]
        fn parse_tuple() {
            assert_eq!(
                parse_exact_type("(uint256,string,address[])"),
                Ok((
                    "",
                    Type::tuple(vec![
                        Type::Uint(256),
                        Type::String,
                        Type::Array(Box::new(Type::Address))
                    ])
                ))
            );

            assert_eq!(
                parse_exact_type("tuple(uint256,(bool,bytes32)[2])[]"),
                Ok((
                    "",
                    Type::Array(Box::new(Type::tuple(vec![
                        Type::Uint(256),
                        Type::FixedArray(
                            Box::new(Type::tuple(vec![Type::Bool, Type::FixedBytes(32)])),
                            2
                        )
                    ])))
                ))
            );

            assert!(parse_exact_type("tuple(uint256,string").is_err());
            assert!(parse_exact_type("tuple(uint256,,string)").is_err());
            assert!(parse_exact_type("tuple(uint256))").is_err());
            assert!(parse_exact_type("tuple()").is_err());
            assert!(parse_exact_type("()[3]").is_err());
        }

        #[test]
        fn parse_named_components() {
            assert_eq!(
                parse_exact_type("tuple(address indexed from, address to ,uint256 value)"),
                Ok((
                    "",
                    Type::Tuple(vec![
                        Param {
                            name: "from".to_string(),
                            type_: Type::Address,
                            indexed: true,
                        },
                        Param::new("to", Type::Address),
                        Param::new("value", Type::Uint(256)),
                    ])
                ))
            );

            // A name starting with the keyword is still a name.
            assert_eq!(
                parse_exact_type("(bool indexedFlag)"),
                Ok(("", Type::Tuple(vec![Param::new("indexedFlag", Type::Bool)])))
            );

            // Duplicate names are rejected.
            assert!(parse_exact_type("(uint8 a, uint8 a)").is_err());
        }

        #[test]
        fn parse_signature() {
            let (_, sig) =
                parse_exact_signature("balanceOf(address owner) returns (uint256)").unwrap();

            assert_eq!(sig.name, "balanceOf");
            assert_eq!(sig.inputs, vec![Param::new("owner", Type::Address)]);
            assert_eq!(sig.outputs, Some(vec![Param::new("", Type::Uint(256))]));
            assert!(!sig.anonymous);

            let (_, sig) = parse_exact_signature("Ping() anonymous").unwrap();

            assert_eq!(sig.name, "Ping");
            assert!(sig.inputs.is_empty());
            assert!(sig.anonymous);

            assert!(parse_exact_signature("1bad(uint256)").is_err());
            assert!(parse_exact_signature("missingParens").is_err());
            assert!(parse_exact_signature("f(())").is_err());
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn display_is_canonical() {
        let ty: Type = "tuple(uint a, (int8 b, bytes c)[] d)[3]".parse().unwrap();

        assert_eq!(ty.to_string(), "(uint256,(int8,bytes)[])[3]");
    }

    #[test]
    fn is_dynamic() {
        let dynamic: Type = "tuple(uint256,string)".parse().unwrap();
        let fixed: Type = "tuple(uint256,address)".parse().unwrap();

        assert!(dynamic.is_dynamic());
        assert!(!fixed.is_dynamic());

        assert!(Type::Bytes.is_dynamic());
        assert!(Type::Array(Box::new(Type::Bool)).is_dynamic());
        assert!(!Type::FixedArray(Box::new(Type::Bool), 4).is_dynamic());
        assert!(Type::FixedArray(Box::new(Type::String), 4).is_dynamic());
    }

    #[test]
    fn head_len() {
        let ty: Type = "(uint256,bool[3],(address,bytes4))".parse().unwrap();
        assert_eq!(ty.head_len(), 32 * 6);

        let ty: Type = "(uint256,string)[2]".parse().unwrap();
        assert_eq!(ty.head_len(), 32);
    }

    #[test]
    fn parse_errors() {
        for s in &["", "uint9", "foo", "(uint256", "bytes[", "tuple", "tuple()", "()[3]"] {
            assert!(matches!(s.parse::<Type>(), Err(Error::Parse(_))), "{}", s);
        }
    }

    #[test]
    fn deserialize() {
        let ty: Type = serde_json::from_str(r#""uint8[2][]""#).unwrap();

        assert_eq!(
            ty,
            Type::Array(Box::new(Type::FixedArray(Box::new(Type::Uint(8)), 2)))
        );
    }
}
