use super::Robot;
use crate::{
    base::{Base, BaseMotion},
    joint::{Friction, JointKind},
    link::{ExternalWrench, Link},
    MultibodyErrors,
};
use mass_properties::{Inertia, MassProperties};
use nalgebra::Vector3;
use ron::{
    from_str,
    ser::{to_string_pretty, PrettyConfig},
};
use serde::{Deserialize, Serialize};
use std::{fs, path::Path};
use symbolic::{Expr, Zero};
use transforms::DhParameters;

/// A parameter given in a description file, either a number or a symbol name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Param {
    Value(f64),
    Symbol(String),
}

impl From<&Param> for Expr {
    fn from(param: &Param) -> Expr {
        match param {
            Param::Value(v) => Expr::num(*v),
            Param::Symbol(name) => Expr::symbol(name),
        }
    }
}

fn or_symbol(param: &Option<Param>, name: &str, j: usize) -> Expr {
    match param {
        Some(p) => Expr::from(p),
        None => Expr::symbol(&format!("{name}{j}")),
    }
}

fn or_zero(param: &Option<Param>) -> Expr {
    param.as_ref().map(Expr::from).unwrap_or_else(Expr::zero)
}

/// Absent geometry parameters are 0.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GeometryParams {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gamma: Option<Param>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub b: Option<Param>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alpha: Option<Param>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub d: Option<Param>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub theta: Option<Param>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub r: Option<Param>,
}

impl GeometryParams {
    fn build(&self) -> DhParameters {
        DhParameters {
            gamma: or_zero(&self.gamma),
            b: or_zero(&self.b),
            alpha: or_zero(&self.alpha),
            d: or_zero(&self.d),
            theta: or_zero(&self.theta),
            r: or_zero(&self.r),
        }
    }
}

/// Absent inertial parameters take their standard symbol (`M{j}`, `MX{j}`, `XX{j}`, ...).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InertialParams {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mass: Option<Param>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mx: Option<Param>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub my: Option<Param>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mz: Option<Param>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub xx: Option<Param>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub xy: Option<Param>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub xz: Option<Param>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub yy: Option<Param>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub yz: Option<Param>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub zz: Option<Param>,
}

impl InertialParams {
    fn build(&self, j: usize) -> Result<MassProperties, MultibodyErrors> {
        let inertia = Inertia::new(
            or_symbol(&self.xx, "XX", j),
            or_symbol(&self.yy, "YY", j),
            or_symbol(&self.zz, "ZZ", j),
            or_symbol(&self.xy, "XY", j),
            or_symbol(&self.xz, "XZ", j),
            or_symbol(&self.yz, "YZ", j),
        )?;
        let first_moment = Vector3::new(
            or_symbol(&self.mx, "MX", j),
            or_symbol(&self.my, "MY", j),
            or_symbol(&self.mz, "MZ", j),
        );
        Ok(MassProperties::new(
            or_symbol(&self.mass, "M", j),
            first_moment,
            inertia,
        )?)
    }
}

/// Absent components take their standard symbol (`FX{j}`, `CX{j}`, ...).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExternalParams {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fx: Option<Param>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fy: Option<Param>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fz: Option<Param>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cx: Option<Param>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cy: Option<Param>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cz: Option<Param>,
}

impl ExternalParams {
    fn build(&self, j: usize) -> ExternalWrench {
        ExternalWrench {
            force: Vector3::new(
                or_symbol(&self.fx, "FX", j),
                or_symbol(&self.fy, "FY", j),
                or_symbol(&self.fz, "FZ", j),
            ),
            torque: Vector3::new(
                or_symbol(&self.cx, "CX", j),
                or_symbol(&self.cy, "CY", j),
                or_symbol(&self.cz, "CZ", j),
            ),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinkBuilder {
    pub ant: usize,
    pub joint: JointKind,
    #[serde(default)]
    pub geometry: GeometryParams,
    #[serde(default)]
    pub inertial: InertialParams,
    #[serde(default)]
    pub external: ExternalParams,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ia: Option<Param>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fs: Option<Param>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fv: Option<Param>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub q: Option<Param>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub qp: Option<Param>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub qdp: Option<Param>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gam: Option<Param>,
}

impl LinkBuilder {
    pub fn new(ant: usize, joint: JointKind) -> Self {
        Self {
            ant,
            joint,
            geometry: GeometryParams::default(),
            inertial: InertialParams::default(),
            external: ExternalParams::default(),
            ia: None,
            fs: None,
            fv: None,
            q: None,
            qp: None,
            qdp: None,
            gam: None,
        }
    }

    fn build(&self, j: usize) -> Result<Link, MultibodyErrors> {
        let mut link = Link::symbolic(j, self.ant, self.joint);
        link.geometry = self.geometry.build();
        link.mass_properties = self.inertial.build(j)?;
        link.external = self.external.build(j);
        // fixed joints keep their zero joint variables whatever the file says
        if !self.joint.is_fixed() {
            link.actuator_inertia = or_symbol(&self.ia, "IA", j);
            link.friction = Friction {
                coulomb: or_symbol(&self.fs, "FS", j),
                viscous: or_symbol(&self.fv, "FV", j),
            };
            link.q = or_symbol(&self.q, "q", j);
            link.qdot = or_symbol(&self.qp, "QP", j);
            link.qddot = or_symbol(&self.qdp, "QDP", j);
            link.torque = or_symbol(&self.gam, "GAM", j);
        }
        Ok(link)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BaseBuilder {
    pub floating: bool,
    /// `[GX, GY, GZ]`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gravity: Option<[Param; 3]>,
    /// `[VDX0, VDY0, VDZ0]`, ignored for a floating base
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub linear_acceleration: Option<[Param; 3]>,
    /// `[WDX0, WDY0, WDZ0]`, ignored for a floating base
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub angular_acceleration: Option<[Param; 3]>,
    /// `[WX0, WY0, WZ0]`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub angular_velocity: Option<[Param; 3]>,
    #[serde(default)]
    pub inertial: InertialParams,
    #[serde(default)]
    pub external: ExternalParams,
}

fn vector(params: &Option<[Param; 3]>, names: [&str; 3]) -> Vector3<Expr> {
    match params {
        Some(p) => Vector3::new(Expr::from(&p[0]), Expr::from(&p[1]), Expr::from(&p[2])),
        None => Vector3::new(
            Expr::symbol(names[0]),
            Expr::symbol(names[1]),
            Expr::symbol(names[2]),
        ),
    }
}

impl BaseBuilder {
    pub fn new(floating: bool) -> Self {
        Self {
            floating,
            gravity: None,
            linear_acceleration: None,
            angular_acceleration: None,
            angular_velocity: None,
            inertial: InertialParams::default(),
            external: ExternalParams::default(),
        }
    }

    fn build(&self) -> Result<(Base, Link), MultibodyErrors> {
        let motion = if self.floating {
            BaseMotion::Floating
        } else {
            BaseMotion::Fixed {
                linear_acceleration: vector(&self.linear_acceleration, ["VDX0", "VDY0", "VDZ0"]),
                angular_acceleration: vector(&self.angular_acceleration, ["WDX0", "WDY0", "WDZ0"]),
            }
        };
        let base = Base {
            motion,
            gravity: vector(&self.gravity, ["GX", "GY", "GZ"]),
            angular_velocity: vector(&self.angular_velocity, ["WX0", "WY0", "WZ0"]),
        };

        let mut link = Link::base();
        link.mass_properties = self.inertial.build(0)?;
        link.external = self.external.build(0);
        Ok((base, link))
    }
}

/// On-disk robot description. `links[k]` describes link `k + 1`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RobotBuilder {
    pub name: String,
    pub base: BaseBuilder,
    pub links: Vec<LinkBuilder>,
}

impl RobotBuilder {
    pub fn new(name: &str, floating: bool) -> Self {
        Self {
            name: name.to_string(),
            base: BaseBuilder::new(floating),
            links: Vec::new(),
        }
    }

    pub fn with_link(mut self, link: LinkBuilder) -> Self {
        self.links.push(link);
        self
    }

    pub fn build(&self) -> Result<Robot, MultibodyErrors> {
        let (base, base_link) = self.base.build()?;
        let mut links = vec![base_link];
        for (k, builder) in self.links.iter().enumerate() {
            links.push(builder.build(k + 1)?);
        }
        Ok(Robot::new(&self.name, base, links)?)
    }

    pub fn from_ron(contents: &str) -> Result<Self, MultibodyErrors> {
        Ok(from_str(contents)?)
    }

    pub fn to_ron(&self) -> Result<String, MultibodyErrors> {
        Ok(to_string_pretty(self, PrettyConfig::new())?)
    }

    pub fn load(path: &Path) -> Result<Self, MultibodyErrors> {
        let contents = fs::read_to_string(path)?;
        Self::from_ron(&contents)
    }

    pub fn save(&self, path: &Path) -> Result<(), MultibodyErrors> {
        fs::write(path, self.to_ron()?)?;
        Ok(())
    }

    /// Two link planar arm carrying a fixed tool, on a fixed base.
    pub fn template() -> Self {
        let mut shoulder = LinkBuilder::new(0, JointKind::Revolute);
        shoulder.fs = Some(Param::Value(0.0));
        let mut elbow = LinkBuilder::new(1, JointKind::Revolute);
        elbow.geometry.d = Some(Param::Symbol("L1".to_string()));
        let mut tool = LinkBuilder::new(2, JointKind::Fixed);
        tool.geometry.d = Some(Param::Value(0.25));
        tool.inertial.mass = Some(Param::Value(0.5));

        let mut robot = RobotBuilder::new("planar_arm", false)
            .with_link(shoulder)
            .with_link(elbow)
            .with_link(tool);
        robot.base.gravity = Some([
            Param::Value(0.0),
            Param::Value(0.0),
            Param::Symbol("GZ".to_string()),
        ]);
        robot
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ModelErrors;

    #[test]
    fn test_defaults_are_symbolic() {
        let robot = RobotBuilder::new("one", false)
            .with_link(LinkBuilder::new(0, JointKind::Revolute))
            .build()
            .unwrap();
        assert_eq!(robot, Robot::from_tables("one", Base::fixed(), &[0], &[0]).unwrap());
    }

    #[test]
    fn test_overrides() {
        let mut link = LinkBuilder::new(0, JointKind::Prismatic);
        link.inertial.mass = Some(Param::Value(3.0));
        link.geometry.alpha = Some(Param::Symbol("alpha".to_string()));
        link.qp = Some(Param::Value(0.0));
        let robot = RobotBuilder::new("one", true).with_link(link).build().unwrap();
        assert!(robot.base.is_floating());
        let link = &robot.links[1];
        assert_eq!(link.mass_properties.mass, Expr::from(3.0));
        assert_eq!(link.geometry.alpha, Expr::symbol("alpha"));
        assert!(link.geometry.d.is_zero());
        assert!(link.qdot.is_zero());
        assert_eq!(link.q, Expr::symbol("q1"));
    }

    #[test]
    fn test_ron_round_trip() {
        let builder = RobotBuilder::template();
        let text = builder.to_ron().unwrap();
        let parsed = RobotBuilder::from_ron(&text).unwrap();
        assert_eq!(parsed, builder);
        assert_eq!(parsed.build().unwrap(), builder.build().unwrap());
    }

    #[test]
    fn test_parse_handwritten() {
        let text = r#"(
            name: "pendulum",
            base: (floating: false, gravity: Some((0.0, "g", 0.0))),
            links: [
                (ant: 0, joint: Revolute, inertial: (mass: Some(2), mx: Some("md")), fv: Some(0.1)),
            ],
        )"#;
        let robot = RobotBuilder::from_ron(text).unwrap().build().unwrap();
        assert_eq!(robot.base.gravity[1], Expr::symbol("g"));
        assert_eq!(robot.links[1].mass_properties.mass, Expr::from(2.0));
        assert_eq!(robot.links[1].mass_properties.first_moment[0], Expr::symbol("md"));
        assert_eq!(robot.links[1].friction.viscous, Expr::from(0.1));
        assert_eq!(robot.links[1].friction.coulomb, Expr::symbol("FS1"));
    }

    #[test]
    fn test_invalid_descriptions() {
        let bad = RobotBuilder::new("bad", false).with_link(LinkBuilder::new(4, JointKind::Revolute));
        assert!(matches!(
            bad.build(),
            Err(MultibodyErrors::Model(ModelErrors::DanglingParent { link: 1, parent: 4 }))
        ));

        let mut link = LinkBuilder::new(0, JointKind::Revolute);
        link.inertial.mass = Some(Param::Value(-1.0));
        let bad = RobotBuilder::new("bad", false).with_link(link);
        assert!(matches!(bad.build(), Err(MultibodyErrors::MassProperties(_))));

        assert!(matches!(
            RobotBuilder::from_ron("(name: 1)"),
            Err(MultibodyErrors::RonParse(_))
        ));
    }

    #[test]
    fn test_template_generates_equations() {
        let robot = RobotBuilder::template().build().unwrap();
        assert_eq!(robot.num_links(), 4);
        assert!(robot.links[3].joint.is_fixed());

        let table = crate::equations_of_motion(&robot, crate::MultibodyAlgorithm::CompositeRigidBody).unwrap();
        assert!(table.definition("GAM1").is_some());
        assert!(table.definition("GAM2").is_some());
        assert!(table.definition("GAM3").unwrap().is_zero());
    }
}
