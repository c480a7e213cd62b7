use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // ==================== 学期表 ====================
        manager
            .create_table(
                Table::create()
                    .table(Semesters::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Semesters::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Semesters::Title).string().not_null())
                    .col(ColumnDef::new(Semesters::FormationCode).string().not_null())
                    .col(ColumnDef::new(Semesters::SemesterIndex).integer().not_null())
                    .col(ColumnDef::new(Semesters::DateDebut).string().not_null())
                    .col(ColumnDef::new(Semesters::DateFin).string().not_null())
                    .col(
                        ColumnDef::new(Semesters::BlockMoyennes)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(Semesters::UseUeCoefs)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .to_owned(),
            )
            .await?;

        // ==================== UE 表 ====================
        manager
            .create_table(
                Table::create()
                    .table(Ues::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Ues::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Ues::FormationCode).string().not_null())
                    .col(ColumnDef::new(Ues::UeCode).string().not_null())
                    .col(ColumnDef::new(Ues::Acronym).string().not_null())
                    .col(ColumnDef::new(Ues::Title).string().not_null())
                    .col(ColumnDef::new(Ues::Ects).double().null())
                    .col(ColumnDef::new(Ues::Coefficient).double().null())
                    .col(
                        ColumnDef::new(Ues::UeType)
                            .string()
                            .not_null()
                            .default("standard"),
                    )
                    .col(
                        ColumnDef::new(Ues::IsExternal)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(ColumnDef::new(Ues::Numero).integer().not_null().default(0))
                    .to_owned(),
            )
            .await?;

        // ==================== 模块实例表 ====================
        manager
            .create_table(
                Table::create()
                    .table(ModuleImpls::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(ModuleImpls::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(ModuleImpls::SemesterId).big_integer().not_null())
                    .col(ColumnDef::new(ModuleImpls::UeId).big_integer().not_null())
                    .col(ColumnDef::new(ModuleImpls::Code).string().not_null())
                    .col(ColumnDef::new(ModuleImpls::Title).string().not_null())
                    .col(
                        ColumnDef::new(ModuleImpls::Coefficient)
                            .double()
                            .not_null()
                            .default(1.0),
                    )
                    .col(
                        ColumnDef::new(ModuleImpls::Kind)
                            .string()
                            .not_null()
                            .default("standard"),
                    )
                    .col(ColumnDef::new(ModuleImpls::Formula).text().null())
                    .col(
                        ColumnDef::new(ModuleImpls::Numero)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .from(ModuleImpls::Table, ModuleImpls::SemesterId)
                            .to(Semesters::Table, Semesters::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .from(ModuleImpls::Table, ModuleImpls::UeId)
                            .to(Ues::Table, Ues::Id)
                            .on_delete(ForeignKeyAction::Restrict),
                    )
                    .to_owned(),
            )
            .await?;

        // ==================== 评测表 ====================
        manager
            .create_table(
                Table::create()
                    .table(Evaluations::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Evaluations::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(Evaluations::ModuleimplId)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Evaluations::MaxScore)
                            .double()
                            .not_null()
                            .default(20.0),
                    )
                    .col(
                        ColumnDef::new(Evaluations::Coefficient)
                            .double()
                            .not_null()
                            .default(1.0),
                    )
                    .col(
                        ColumnDef::new(Evaluations::EvaluationType)
                            .string()
                            .not_null()
                            .default("normal"),
                    )
                    .col(
                        ColumnDef::new(Evaluations::ImmediateInclusion)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(ColumnDef::new(Evaluations::Date).string().null())
                    .col(
                        ColumnDef::new(Evaluations::Numero)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .from(Evaluations::Table, Evaluations::ModuleimplId)
                            .to(ModuleImpls::Table, ModuleImpls::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // ==================== 成绩表 ====================
        manager
            .create_table(
                Table::create()
                    .table(Scores::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Scores::EvaluationId).big_integer().not_null())
                    .col(ColumnDef::new(Scores::StudentId).big_integer().not_null())
                    .col(ColumnDef::new(Scores::Kind).string().not_null())
                    .col(ColumnDef::new(Scores::Value).double().null())
                    .col(ColumnDef::new(Scores::UpdatedAt).big_integer().not_null())
                    .primary_key(
                        Index::create()
                            .col(Scores::EvaluationId)
                            .col(Scores::StudentId),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .from(Scores::Table, Scores::EvaluationId)
                            .to(Evaluations::Table, Evaluations::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // ==================== 注册表 ====================
        manager
            .create_table(
                Table::create()
                    .table(SemesterEnrollments::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(SemesterEnrollments::SemesterId)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(SemesterEnrollments::StudentId)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(SemesterEnrollments::State)
                            .string()
                            .not_null()
                            .default("I"),
                    )
                    .col(
                        ColumnDef::new(SemesterEnrollments::SortName)
                            .string()
                            .not_null(),
                    )
                    .primary_key(
                        Index::create()
                            .col(SemesterEnrollments::SemesterId)
                            .col(SemesterEnrollments::StudentId),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .from(SemesterEnrollments::Table, SemesterEnrollments::SemesterId)
                            .to(Semesters::Table, Semesters::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(ModuleEnrollments::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(ModuleEnrollments::ModuleimplId)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ModuleEnrollments::StudentId)
                            .big_integer()
                            .not_null(),
                    )
                    .primary_key(
                        Index::create()
                            .col(ModuleEnrollments::ModuleimplId)
                            .col(ModuleEnrollments::StudentId),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .from(ModuleEnrollments::Table, ModuleEnrollments::ModuleimplId)
                            .to(ModuleImpls::Table, ModuleImpls::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // ==================== 学期内 UE 设置 ====================
        manager
            .create_table(
                Table::create()
                    .table(UeSettings::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(UeSettings::SemesterId).big_integer().not_null())
                    .col(ColumnDef::new(UeSettings::UeId).big_integer().not_null())
                    .col(ColumnDef::new(UeSettings::Formula).text().null())
                    .col(ColumnDef::new(UeSettings::Coefficient).double().null())
                    .primary_key(
                        Index::create()
                            .col(UeSettings::SemesterId)
                            .col(UeSettings::UeId),
                    )
                    .to_owned(),
            )
            .await?;

        // ==================== 已取得的 UE（资本化来源） ====================
        manager
            .create_table(
                Table::create()
                    .table(UeValidations::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(UeValidations::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(UeValidations::StudentId).big_integer().not_null())
                    .col(ColumnDef::new(UeValidations::UeCode).string().not_null())
                    .col(ColumnDef::new(UeValidations::Average).double().null())
                    .col(
                        ColumnDef::new(UeValidations::SourceSemesterId)
                            .big_integer()
                            .null(),
                    )
                    .col(ColumnDef::new(UeValidations::Coefficient).double().null())
                    .col(
                        ColumnDef::new(UeValidations::IsExternal)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(ColumnDef::new(UeValidations::EventDate).string().not_null())
                    .to_owned(),
            )
            .await?;

        // ==================== 缺勤统计 ====================
        manager
            .create_table(
                Table::create()
                    .table(Absences::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Absences::SemesterId).big_integer().not_null())
                    .col(ColumnDef::new(Absences::StudentId).big_integer().not_null())
                    .col(ColumnDef::new(Absences::Total).integer().not_null().default(0))
                    .col(
                        ColumnDef::new(Absences::Justified)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .primary_key(
                        Index::create()
                            .col(Absences::SemesterId)
                            .col(Absences::StudentId),
                    )
                    .to_owned(),
            )
            .await?;

        // 索引
        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_ues_formation_code")
                    .table(Ues::Table)
                    .col(Ues::FormationCode)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_module_impls_semester_id")
                    .table(ModuleImpls::Table)
                    .col(ModuleImpls::SemesterId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_evaluations_moduleimpl_id")
                    .table(Evaluations::Table)
                    .col(Evaluations::ModuleimplId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_ue_validations_student_id")
                    .table(UeValidations::Table)
                    .col(UeValidations::StudentId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_ue_validations_source_semester_id")
                    .table(UeValidations::Table)
                    .col(UeValidations::SourceSemesterId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Absences::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(UeValidations::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(UeSettings::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(ModuleEnrollments::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(SemesterEnrollments::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Scores::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Evaluations::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(ModuleImpls::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Ues::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Semesters::Table).to_owned())
            .await?;
        Ok(())
    }
}

#[derive(DeriveIden)]
enum Semesters {
    Table,
    Id,
    Title,
    FormationCode,
    SemesterIndex,
    DateDebut,
    DateFin,
    BlockMoyennes,
    UseUeCoefs,
}

#[derive(DeriveIden)]
enum Ues {
    Table,
    Id,
    FormationCode,
    UeCode,
    Acronym,
    Title,
    Ects,
    Coefficient,
    UeType,
    IsExternal,
    Numero,
}

#[derive(DeriveIden)]
enum ModuleImpls {
    Table,
    Id,
    SemesterId,
    UeId,
    Code,
    Title,
    Coefficient,
    Kind,
    Formula,
    Numero,
}

#[derive(DeriveIden)]
enum Evaluations {
    Table,
    Id,
    ModuleimplId,
    MaxScore,
    Coefficient,
    EvaluationType,
    ImmediateInclusion,
    Date,
    Numero,
}

#[derive(DeriveIden)]
enum Scores {
    Table,
    EvaluationId,
    StudentId,
    Kind,
    Value,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum SemesterEnrollments {
    Table,
    SemesterId,
    StudentId,
    State,
    SortName,
}

#[derive(DeriveIden)]
enum ModuleEnrollments {
    Table,
    ModuleimplId,
    StudentId,
}

#[derive(DeriveIden)]
enum UeSettings {
    Table,
    SemesterId,
    UeId,
    Formula,
    Coefficient,
}

#[derive(DeriveIden)]
enum UeValidations {
    Table,
    Id,
    StudentId,
    UeCode,
    Average,
    SourceSemesterId,
    Coefficient,
    IsExternal,
    EventDate,
}

#[derive(DeriveIden)]
enum Absences {
    Table,
    SemesterId,
    StudentId,
    Total,
    Justified,
}
